//! Exhaustive hyperparameter search scored by cross-validated R²

use super::cross_validation::{CVResults, CrossValidator};
use super::linear_models::r2_score;
use crate::error::{CostBenchError, Result};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hyperparameters of one tree-based candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl std::fmt::Display for TreeParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let depth = self
            .max_depth
            .map_or_else(|| "None".to_string(), |d| d.to_string());
        write!(
            f,
            "n_estimators={}, max_depth={}, min_samples_split={}, min_samples_leaf={}",
            self.n_estimators, depth, self.min_samples_split, self.min_samples_leaf
        )
    }
}

/// Cartesian product in row-major order (last axis varies fastest)
pub fn expand_grid(
    n_estimators: &[usize],
    max_depth: &[Option<usize>],
    min_samples_split: &[usize],
    min_samples_leaf: &[usize],
) -> Vec<TreeParams> {
    let mut grid = Vec::new();
    for &n in n_estimators {
        for &depth in max_depth {
            for &split in min_samples_split {
                for &leaf in min_samples_leaf {
                    grid.push(TreeParams {
                        n_estimators: n,
                        max_depth: depth,
                        min_samples_split: split,
                        min_samples_leaf: leaf,
                    });
                }
            }
        }
    }
    grid
}

/// Outcome of a search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResult<P> {
    pub best_params: P,
    pub best_index: usize,
    pub cv_results: Vec<CVResults>,
}

/// Pick the candidate with the highest mean validation R².
///
/// `fit_predict(params, x_train, y_train, x_valid)` trains a fresh model and
/// returns validation predictions. All (candidate, fold) fits run in
/// parallel; on equal means the earlier candidate wins.
pub fn grid_search<P, F>(
    candidates: &[P],
    x: &Array2<f64>,
    y: &Array1<f64>,
    cv: &CrossValidator,
    fit_predict: F,
) -> Result<GridSearchResult<P>>
where
    P: Clone + Send + Sync + std::fmt::Display,
    F: Fn(&P, &Array2<f64>, &Array1<f64>, &Array2<f64>) -> Result<Array1<f64>> + Sync,
{
    if candidates.is_empty() {
        return Err(CostBenchError::ConfigError("empty hyperparameter grid".to_string()));
    }

    let splits = cv.split(x.nrows())?;
    let jobs: Vec<(usize, usize)> = (0..candidates.len())
        .flat_map(|c| (0..splits.len()).map(move |f| (c, f)))
        .collect();

    let scores: Vec<f64> = jobs
        .par_iter()
        .map(|&(c, f)| {
            let split = &splits[f];
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train = y.select(Axis(0), &split.train_indices);
            let x_valid = x.select(Axis(0), &split.test_indices);
            let y_valid = y.select(Axis(0), &split.test_indices);
            let pred = fit_predict(&candidates[c], &x_train, &y_train, &x_valid)?;
            Ok(r2_score(&y_valid, &pred))
        })
        .collect::<Result<Vec<_>>>()?;

    let n_folds = splits.len();
    let cv_results: Vec<CVResults> = scores
        .chunks(n_folds)
        .map(|chunk| CVResults::from_scores(chunk.to_vec()))
        .collect();

    let mut best_index = 0;
    for (i, result) in cv_results.iter().enumerate() {
        debug!(params = %candidates[i], mean_r2 = result.mean_score, "grid candidate scored");
        if result.mean_score > cv_results[best_index].mean_score {
            best_index = i;
        }
    }

    Ok(GridSearchResult {
        best_params: candidates[best_index].clone(),
        best_index,
        cv_results,
    })
}
