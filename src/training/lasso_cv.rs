//! Lasso with the regularization strength chosen by cross-validation

use super::cross_validation::CrossValidator;
use super::linear_models::LassoRegression;
use crate::config::LassoSearch;
use crate::error::{CostBenchError, Result};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lasso over a log-spaced alpha path, scored by K-fold mean squared error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoCV {
    pub search: LassoSearch,
    pub cv_folds: usize,
    /// Alphas tried, largest first
    pub alphas: Vec<f64>,
    /// Mean validation MSE per alpha
    pub mean_mse: Vec<f64>,
    /// Selected alpha
    pub alpha: Option<f64>,
    model: Option<LassoRegression>,
}

impl LassoCV {
    pub fn new(search: LassoSearch, cv_folds: usize) -> Self {
        Self {
            search,
            cv_folds,
            alphas: Vec::new(),
            mean_mse: Vec::new(),
            alpha: None,
            model: None,
        }
    }

    /// Geometric grid from `max |Xcᵀ yc| / n` down to that times `alpha_eps`
    pub fn alpha_grid(x: &Array2<f64>, y: &Array1<f64>, n_alphas: usize, alpha_eps: f64) -> Vec<f64> {
        let n = x.nrows().max(1) as f64;
        let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let y_mean = y.mean().unwrap_or(0.0);
        let x_c = x - &x_mean.insert_axis(Axis(0));
        let y_c = y - y_mean;

        let alpha_max = x_c
            .t()
            .dot(&y_c)
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
            / n;

        if alpha_max <= f64::EPSILON || n_alphas == 1 {
            return vec![alpha_max.max(f64::EPSILON); n_alphas.max(1)];
        }

        let log_max = alpha_max.ln();
        let log_min = (alpha_max * alpha_eps).ln();
        (0..n_alphas)
            .map(|i| {
                let t = i as f64 / (n_alphas - 1) as f64;
                (log_max + t * (log_min - log_max)).exp()
            })
            .collect()
    }

    /// Fit one warm-started path and return validation MSE per alpha
    fn path_mse(
        &self,
        alphas: &[f64],
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_valid: &Array2<f64>,
        y_valid: &Array1<f64>,
    ) -> Result<Vec<f64>> {
        let mut warm = Array1::zeros(x_train.ncols());
        let mut mse = Vec::with_capacity(alphas.len());

        for &alpha in alphas {
            let mut model = LassoRegression::new(alpha)
                .with_max_iter(self.search.max_iter)
                .with_tol(self.search.tol)
                .with_warm_start(warm);
            model.fit(x_train, y_train)?;

            let pred = model.predict(x_valid)?;
            let err = (&pred - y_valid).mapv(|v| v * v).mean().unwrap_or(f64::INFINITY);
            mse.push(err);

            warm = model.coefficients.clone().unwrap_or_else(|| Array1::zeros(x_train.ncols()));
        }

        Ok(mse)
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(CostBenchError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let alphas = Self::alpha_grid(x, y, self.search.n_alphas, self.search.alpha_eps);
        let splits = CrossValidator::k_fold(self.cv_folds).split(x.nrows())?;

        let fold_mse: Vec<Vec<f64>> = splits
            .par_iter()
            .map(|split| {
                let x_train = x.select(Axis(0), &split.train_indices);
                let y_train = y.select(Axis(0), &split.train_indices);
                let x_valid = x.select(Axis(0), &split.test_indices);
                let y_valid = y.select(Axis(0), &split.test_indices);
                self.path_mse(&alphas, &x_train, &y_train, &x_valid, &y_valid)
            })
            .collect::<Result<Vec<_>>>()?;

        let n_folds = fold_mse.len() as f64;
        let mean_mse: Vec<f64> = (0..alphas.len())
            .map(|a| fold_mse.iter().map(|f| f[a]).sum::<f64>() / n_folds)
            .collect();

        // Strict comparison keeps the largest alpha among equal errors
        let mut best = 0;
        for (i, &mse) in mean_mse.iter().enumerate() {
            if mse < mean_mse[best] {
                best = i;
            }
        }
        let best_alpha = alphas[best];

        let mut model = LassoRegression::new(best_alpha)
            .with_max_iter(self.search.max_iter)
            .with_tol(self.search.tol);
        model.fit(x, y)?;

        debug!(
            alpha = best_alpha,
            cv_mse = mean_mse[best],
            nonzero = model.coefficients.as_ref().map_or(0, |c| c.iter().filter(|&&v| v != 0.0).count()),
            "LassoCV selected alpha"
        );

        self.alphas = alphas;
        self.mean_mse = mean_mse;
        self.alpha = Some(best_alpha);
        self.model = Some(model);
        Ok(self)
    }

    /// The refitted model at the selected alpha
    pub fn model(&self) -> Result<&LassoRegression> {
        self.model.as_ref().ok_or(CostBenchError::ModelNotFitted)
    }

    pub fn model_mut(&mut self) -> Result<&mut LassoRegression> {
        self.model.as_mut().ok_or(CostBenchError::ModelNotFitted)
    }

    pub fn coefficients(&self) -> Result<&Array1<f64>> {
        self.model()?
            .coefficients
            .as_ref()
            .ok_or(CostBenchError::ModelNotFitted)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.model()?.predict(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::r2_score;
    use ndarray::Array2;

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        // y depends on the first column only; the second is a deterministic nuisance
        let n = 40;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                i as f64
            } else {
                ((i * 7) % 11) as f64
            }
        });
        let y = x.column(0).mapv(|v| 3.0 * v + 2.0);
        (x, y)
    }

    #[test]
    fn test_alpha_grid_is_descending_and_log_spaced() {
        let (x, y) = linear_data();
        let grid = LassoCV::alpha_grid(&x, &y, 5, 1e-2);
        assert_eq!(grid.len(), 5);
        assert!(grid.windows(2).all(|w| w[0] > w[1]));
        assert!((grid[4] / grid[0] - 1e-2).abs() < 1e-9);

        // At alpha_max every coefficient is zero
        let mut model = LassoRegression::new(grid[0]);
        model.fit(&x, &y).unwrap();
        assert!(model.coefficients.unwrap().iter().all(|c| c.abs() < 1e-9));
    }

    #[test]
    fn test_lasso_cv_recovers_signal() {
        let (x, y) = linear_data();
        let mut cv = LassoCV::new(LassoSearch::default(), 5);
        cv.fit(&x, &y).unwrap();

        let coef = cv.coefficients().unwrap();
        assert!((coef[0] - 3.0).abs() < 0.05, "coef = {}", coef[0]);
        assert!(coef[1].abs() < 0.05);
        assert!(r2_score(&y, &cv.predict(&x).unwrap()) > 0.999);
        assert_eq!(cv.mean_mse.len(), 100);
    }

    #[test]
    fn test_unfitted() {
        let cv = LassoCV::new(LassoSearch::default(), 5);
        assert!(cv.coefficients().is_err());
    }
}
