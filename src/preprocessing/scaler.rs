//! Standard scaling on dense matrices
//!
//! Statistics ignore NaN cells and NaN cells pass through unchanged, so the
//! scaler can run before imputation.

use crate::error::{CostBenchError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Z-score scaler: `(x - mean) / std` with the population standard deviation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    /// Fit per-column mean and standard deviation. Constant (or empty)
    /// columns get a scale of 1.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let n_features = x.ncols();
        let mut mean = Array1::zeros(n_features);
        let mut scale = Array1::ones(n_features);

        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let present: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            if present.is_empty() {
                continue;
            }
            let n = present.len() as f64;
            let m = present.iter().sum::<f64>() / n;
            let var = present.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
            mean[j] = m;
            if var > 0.0 && var.is_finite() {
                scale[j] = var.sqrt();
            }
        }

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(self)
    }

    fn params(&self, n_features: usize) -> Result<(&Array1<f64>, &Array1<f64>)> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(CostBenchError::ModelNotFitted),
        };
        if mean.len() != n_features {
            return Err(CostBenchError::ShapeError {
                expected: format!("{} features", mean.len()),
                actual: format!("{} features", n_features),
            });
        }
        Ok((mean, scale))
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = self.params(x.ncols())?;
        let mut out = x.clone();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            column.mapv_inplace(|v| (v - mean[j]) / scale[j]);
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = self.params(x.ncols())?;
        let mut out = x.clone();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            column.mapv_inplace(|v| v * scale[j] + mean[j]);
        }
        Ok(out)
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaling() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        assert_eq!(scaled[[0, 0]], -1.0);
        assert_eq!(scaled[[1, 0]], 1.0);
        // Constant column: scale falls back to 1
        assert_eq!(scaled[[0, 1]], 0.0);
    }

    #[test]
    fn test_nan_ignored_and_preserved() {
        let x = array![[1.0], [f64::NAN], [3.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        assert_eq!(scaler.mean().unwrap()[0], 2.0);
        assert!(scaled[[1, 0]].is_nan());
        assert_eq!(scaled[[2, 0]], 1.0);
    }

    #[test]
    fn test_inverse_round_trip() {
        let x = array![[1.0, -2.0], [4.0, 0.5], [7.0, 3.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();
        let back = scaler.inverse_transform(&scaled).unwrap();
        for (a, b) in x.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_unfitted_and_width_mismatch() {
        let scaler = StandardScaler::new();
        assert!(matches!(scaler.transform(&array![[1.0]]), Err(CostBenchError::ModelNotFitted)));

        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }
}
