//! Regression error metrics

use crate::error::{CostBenchError, Result};
use ndarray::Array1;

/// Denominator floor for MAPE, so zero actuals give a large finite error
pub const MAPE_EPSILON: f64 = f64::EPSILON;

fn check_pair(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(CostBenchError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(CostBenchError::ValidationError(
            "cannot compute a metric over zero rows".to_string(),
        ));
    }
    Ok(())
}

/// Mean squared error
pub fn mse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    Ok((y_true - y_pred).mapv(|d| d * d).sum() / y_true.len() as f64)
}

/// Root mean squared error
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    Ok(mse(y_true, y_pred)?.sqrt())
}

/// Mean absolute error
pub fn mae(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    Ok((y_true - y_pred).mapv(f64::abs).sum() / y_true.len() as f64)
}

/// Mean absolute percentage error as a fraction: `mean(|y - p| / max(|y|, eps))`
pub fn mape(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    let total: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&y, &p)| (y - p).abs() / y.abs().max(MAPE_EPSILON))
        .sum();
    Ok(total / y_true.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_metrics() {
        let y = array![1.0, 2.0, 4.0];
        let p = array![2.0, 2.0, 2.0];

        assert!((mse(&y, &p).unwrap() - 5.0 / 3.0).abs() < 1e-12);
        assert!((rmse(&y, &p).unwrap() - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((mae(&y, &p).unwrap() - 1.0).abs() < 1e-12);
        assert!((mape(&y, &p).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mape_zero_actual_is_finite() {
        let value = mape(&array![0.0], &array![1.0]).unwrap();
        assert!(value.is_finite());
        assert!(value > 1e10);
    }

    #[test]
    fn test_mismatched_and_empty() {
        assert!(rmse(&array![1.0, 2.0], &array![1.0]).is_err());
        assert!(mae(&Array1::zeros(0), &Array1::zeros(0)).is_err());
    }
}
