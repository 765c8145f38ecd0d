//! Density-based clustering (DBSCAN)
//!
//! Labels are integers: clusters are numbered from 0 in order of discovery,
//! noise points get [`NOISE_LABEL`].

use crate::error::{CostBenchError, Result};
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Label assigned to points that belong to no dense region
pub const NOISE_LABEL: i64 = -1;

/// DBSCAN (Density-Based Spatial Clustering of Applications with Noise)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DBSCAN {
    /// Maximum distance between neighbors
    pub eps: f64,
    /// Minimum points (the point itself included) to form a dense region
    pub min_samples: usize,
    /// Assigned cluster labels
    pub labels: Option<Vec<i64>>,
    /// Number of clusters found (excluding noise)
    pub n_clusters_found: usize,
    /// Number of noise points
    pub n_noise: usize,
    pub is_fitted: bool,
}

impl Default for DBSCAN {
    fn default() -> Self {
        Self::new(0.5, 5)
    }
}

impl DBSCAN {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self {
            eps,
            min_samples,
            labels: None,
            n_clusters_found: 0,
            n_noise: 0,
            is_fitted: false,
        }
    }

    fn euclidean_dist(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
    }

    /// Find all neighbors within eps distance, the point itself included
    fn region_query(x: &Array2<f64>, point_idx: usize, eps: f64) -> Vec<usize> {
        let row = x.row(point_idx);
        (0..x.nrows())
            .filter(|&i| Self::euclidean_dist(&row, &x.row(i)) <= eps)
            .collect()
    }

    /// Fit the model (unsupervised)
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if !(self.eps > 0.0) {
            return Err(CostBenchError::InvalidParameter {
                name: "eps".to_string(),
                value: self.eps.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(CostBenchError::DataError(
                "DBSCAN input contains missing or non-finite values".to_string(),
            ));
        }

        let n_samples = x.nrows();
        let eps = self.eps;
        let min_samples = self.min_samples;

        // Pre-compute neighbor lists for all points (parallelized)
        let neighbors: Vec<Vec<usize>> = (0..n_samples)
            .into_par_iter()
            .map(|i| Self::region_query(x, i, eps))
            .collect();

        let is_core: Vec<bool> = neighbors.iter().map(|n| n.len() >= min_samples).collect();

        let mut labels = vec![NOISE_LABEL; n_samples];
        let mut cluster_id: i64 = 0;

        for i in 0..n_samples {
            if labels[i] != NOISE_LABEL || !is_core[i] {
                continue;
            }

            // Expand cluster from core point i
            labels[i] = cluster_id;
            let mut queue: Vec<usize> = neighbors[i].clone();
            let mut head = 0;

            while head < queue.len() {
                let q = queue[head];
                head += 1;

                if labels[q] == NOISE_LABEL {
                    labels[q] = cluster_id;
                }
                if !is_core[q] {
                    continue;
                }
                for &neighbor in &neighbors[q] {
                    if labels[neighbor] == NOISE_LABEL {
                        labels[neighbor] = cluster_id;
                        queue.push(neighbor);
                    }
                }
            }

            cluster_id += 1;
        }

        self.n_noise = labels.iter().filter(|&&l| l == NOISE_LABEL).count();
        self.n_clusters_found = cluster_id as usize;
        self.labels = Some(labels);
        self.is_fitted = true;
        Ok(self)
    }

    /// Fit and return the labels
    pub fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Vec<i64>> {
        self.fit(x)?;
        self.labels.clone().ok_or(CostBenchError::ModelNotFitted)
    }
}
