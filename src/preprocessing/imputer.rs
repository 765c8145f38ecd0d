//! KNN-based imputation with NaN-aware euclidean distance

use crate::error::{CostBenchError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Fills each missing cell with the mean of that column over the `k`
/// nearest training rows that have the column present.
///
/// Distances use only coordinates present in both rows, scaled up by
/// `n_features / n_common` so rows with fewer shared coordinates are
/// comparable. A cell with no usable donor gets the training column mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNImputer {
    n_neighbors: usize,
    donors: Option<Array2<f64>>,
    column_means: Option<Array1<f64>>,
}

impl Default for KNNImputer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KNNImputer {
    /// Create new KNN imputer
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            donors: None,
            column_means: None,
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    fn nan_euclidean(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> Option<f64> {
        let mut common = 0usize;
        let mut accum = 0.0f64;
        for (&ai, &bi) in a.iter().zip(b.iter()) {
            if ai.is_nan() || bi.is_nan() {
                continue;
            }
            common += 1;
            accum += (ai - bi).powi(2);
        }
        if common == 0 {
            return None;
        }
        Some((accum * a.len() as f64 / common as f64).sqrt())
    }

    /// Store the training rows as donors
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(CostBenchError::ValidationError(
                "KNN imputer needs at least one training row".to_string(),
            ));
        }

        let means: Array1<f64> = x
            .axis_iter(Axis(1))
            .map(|col| {
                let present: Vec<f64> = col.iter().copied().filter(|v| !v.is_nan()).collect();
                if present.is_empty() {
                    0.0
                } else {
                    present.iter().sum::<f64>() / present.len() as f64
                }
            })
            .collect();

        self.donors = Some(x.clone());
        self.column_means = Some(means);
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (donors, means) = match (&self.donors, &self.column_means) {
            (Some(d), Some(m)) => (d, m),
            _ => return Err(CostBenchError::ModelNotFitted),
        };
        if x.ncols() != donors.ncols() {
            return Err(CostBenchError::ShapeError {
                expected: format!("{} features", donors.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let k = self.n_neighbors;
        let rows: Vec<Array1<f64>> = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| {
                let mut filled = row.to_owned();
                if !row.iter().any(|v| v.is_nan()) {
                    return filled;
                }

                let distances: Vec<Option<f64>> = donors
                    .axis_iter(Axis(0))
                    .map(|donor| Self::nan_euclidean(&row, &donor))
                    .collect();

                for j in 0..row.len() {
                    if !row[j].is_nan() {
                        continue;
                    }
                    let mut candidates: Vec<(f64, usize)> = distances
                        .iter()
                        .enumerate()
                        .filter_map(|(i, d)| match d {
                            Some(d) if !donors[[i, j]].is_nan() => Some((*d, i)),
                            _ => None,
                        })
                        .collect();

                    if candidates.is_empty() {
                        filled[j] = means[j];
                        continue;
                    }
                    // Stable sort: nearer first, earlier row on equal distance
                    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
                    let take = candidates.len().min(k);
                    filled[j] = candidates[..take].iter().map(|&(_, i)| donors[[i, j]]).sum::<f64>()
                        / take as f64;
                }
                filled
            })
            .collect();

        let mut out = Array2::zeros(x.dim());
        for (i, row) in rows.into_iter().enumerate() {
            out.row_mut(i).assign(&row);
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}
