//! Linear model implementations

use crate::error::{CostBenchError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Retries once with a small ridge if the matrix is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    if let Some(x) = cholesky_factor_solve(a, b) {
        return Some(x);
    }

    let mut a_reg = a.clone();
    let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
    for k in 0..n {
        a_reg[[k, k]] += ridge;
    }
    cholesky_factor_solve(&a_reg, b)
}

fn cholesky_factor_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Matrix inversion by Gauss-Jordan elimination with partial pivoting.
/// Returns `None` for (numerically) singular input.
pub(crate) fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    // Augmented matrix [M | I]
    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    let scale = m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }

        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-12 * scale {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }

    Some(inv)
}

/// Solve least squares via normal equations: (X^T X) w = X^T y
/// Uses Cholesky decomposition with fallback to Gauss-Jordan
fn solve_least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Option<Array1<f64>> {
    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);

    if let Some(result) = cholesky_solve(&xtx, &xty) {
        return Some(result);
    }

    matrix_inverse(&xtx).map(|inv| inv.dot(&xty))
}

/// Coefficient of determination of `y_pred` against `y`
pub fn r2_score(y: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let y_mean = y.mean().unwrap_or(0.0);
    let ss_res = (y_pred - y).mapv(|v| v * v).sum();
    let ss_tot = y.mapv(|v| (v - y_mean) * (v - y_mean)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }

    1.0 - ss_res / ss_tot
}

fn check_lengths(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(CostBenchError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(CostBenchError::DataError("cannot fit on zero rows".to_string()));
    }
    Ok(())
}

/// Mean-center columns and target, returning the means for the intercept
fn center(x: &Array2<f64>, y: &Array1<f64>) -> (Array2<f64>, Array1<f64>, Array1<f64>, f64) {
    let x_mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let y_mean = y.mean().unwrap_or(0.0);
    let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
    let y_centered = y - y_mean;
    (x_centered, y_centered, x_mean, y_mean)
}

/// Ordinary least squares regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: Option<f64>,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    /// Create a new linear regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            is_fitted: false,
        }
    }

    /// Fit the model to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_lengths(x, y)?;

        // Centered solve; the intercept comes back from the means
        let (x_c, y_c, x_mean, y_mean) = center(x, y);
        let coefficients = solve_least_squares(&x_c, &y_c).ok_or_else(|| {
            CostBenchError::ComputationError(
                "Matrix is singular, cannot solve least squares".to_string(),
            )
        })?;
        let intercept = y_mean - coefficients.dot(&x_mean);

        if coefficients.iter().any(|c| !c.is_finite()) || !intercept.is_finite() {
            return Err(CostBenchError::ComputationError(
                "least squares produced non-finite coefficients".to_string(),
            ));
        }

        self.coefficients = Some(coefficients);
        self.intercept = Some(intercept);
        self.is_fitted = true;

        Ok(self)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match (&self.coefficients, self.is_fitted) {
            (Some(coefficients), true) => Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0)),
            _ => Err(CostBenchError::ModelNotFitted),
        }
    }
}

/// Polynomial regression on a single input column.
///
/// The input is standardized before the powers 1..=degree are taken, which
/// keeps the normal equations well conditioned and leaves R² unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialRegression {
    pub degree: usize,
    inner: LinearRegression,
    center: f64,
    scale: f64,
    pub is_fitted: bool,
}

impl PolynomialRegression {
    pub fn new(degree: usize) -> Self {
        Self {
            degree: degree.max(1),
            inner: LinearRegression::new(),
            center: 0.0,
            scale: 1.0,
            is_fitted: false,
        }
    }

    /// Vandermonde expansion without the constant column
    fn expand(&self, x: &Array1<f64>) -> Array2<f64> {
        let z = x.mapv(|v| (v - self.center) / self.scale);
        Array2::from_shape_fn((z.len(), self.degree), |(i, d)| z[i].powi(d as i32 + 1))
    }

    pub fn fit(&mut self, x: &Array1<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n = x.len().max(1) as f64;
        self.center = x.mean().unwrap_or(0.0);
        let var = x.mapv(|v| (v - self.center).powi(2)).sum() / n;
        self.scale = if var > 0.0 { var.sqrt() } else { 1.0 };

        let expanded = self.expand(x);
        self.inner.fit(&expanded, y)?;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(CostBenchError::ModelNotFitted);
        }
        self.inner.predict(&self.expand(x))
    }

    pub fn score(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<f64> {
        Ok(r2_score(y, &self.predict(x)?))
    }
}

/// Lasso regression fitted by cyclic coordinate descent.
///
/// Minimizes `(1 / 2n) * ||y - Xw - b||² + alpha * ||w||₁`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    /// L1 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub is_fitted: bool,
    /// Number of sweeps the last fit used
    pub n_iter: usize,
    #[serde(skip)]
    warm_start: Option<Array1<f64>>,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha,
            max_iter: 1000,
            tol: 1e-4,
            is_fitted: false,
            n_iter: 0,
            warm_start: None,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Start coordinate descent from these coefficients (regularization paths)
    pub fn with_warm_start(mut self, coefficients: Array1<f64>) -> Self {
        self.warm_start = Some(coefficients);
        self
    }

    /// Soft-threshold operator for L1 proximal step
    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_lengths(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let (x_c, y_c, x_mean, y_mean) = center(x, y);

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| x_c.column(j).mapv(|v| v * v).sum())
            .collect();

        let mut w = match self.warm_start.take() {
            Some(start) if start.len() == n_features => start,
            _ => Array1::zeros(n_features),
        };
        let lambda = self.alpha * n_samples as f64;
        let mut r = &y_c - &x_c.dot(&w);

        self.n_iter = 0;
        for iter in 0..self.max_iter {
            self.n_iter = iter + 1;
            let mut max_change = 0.0_f64;
            let mut max_weight = 0.0_f64;

            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    w[j] = 0.0;
                    continue;
                }
                let rho = x_c.column(j).dot(&r) + col_norms[j] * w[j];
                let old_wj = w[j];
                w[j] = Self::soft_threshold(rho, lambda) / col_norms[j];

                let delta = old_wj - w[j];
                if delta != 0.0 {
                    r.scaled_add(delta, &x_c.column(j));
                }
                max_change = max_change.max(delta.abs());
                max_weight = max_weight.max(w[j].abs());
            }

            if max_weight == 0.0 || max_change / max_weight < self.tol {
                break;
            }
        }

        self.intercept = Some(y_mean - w.dot(&x_mean));
        self.coefficients = Some(w);
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match (&self.coefficients, self.is_fitted) {
            (Some(coefficients), true) => Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0)),
            _ => Err(CostBenchError::ModelNotFitted),
        }
    }

    /// Set negative coefficients to zero; the intercept is left as fitted
    pub fn clamp_negative_coefficients(&mut self) {
        if let Some(coef) = self.coefficients.as_mut() {
            coef.mapv_inplace(|c| c.max(0.0));
        }
    }
}
