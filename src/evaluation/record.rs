//! Evaluation records

use super::metrics::{mae, mape, rmse};
use crate::error::Result;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Train and test error metrics of one model, formatted to two decimals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Training RMSE")]
    pub train_rmse: String,
    #[serde(rename = "Training MAE")]
    pub train_mae: String,
    #[serde(rename = "Training MAPE")]
    pub train_mape: String,
    #[serde(rename = "Testing RMSE")]
    pub test_rmse: String,
    #[serde(rename = "Testing MAE")]
    pub test_mae: String,
    #[serde(rename = "Testing MAPE")]
    pub test_mape: String,
}

impl EvaluationRecord {
    /// Report column headers, in field order
    pub const HEADERS: [&'static str; 7] = [
        "Model",
        "Training RMSE",
        "Training MAE",
        "Training MAPE",
        "Testing RMSE",
        "Testing MAE",
        "Testing MAPE",
    ];

    /// Cells in [`Self::HEADERS`] order
    pub fn cells(&self) -> [&str; 7] {
        [
            &self.model,
            &self.train_rmse,
            &self.train_mae,
            &self.train_mape,
            &self.test_rmse,
            &self.test_mae,
            &self.test_mape,
        ]
    }

    /// Test MAPE as a number (the rounded value that is reported).
    ///
    /// Unparseable text reads as NaN.
    pub fn testing_mape(&self) -> f64 {
        self.test_mape.parse().unwrap_or(f64::NAN)
    }
}

/// Whether `candidate` beats `incumbent`; NaN never wins, equal values keep the incumbent
pub fn lower_mape(candidate: f64, incumbent: f64) -> bool {
    candidate < incumbent || (incumbent.is_nan() && !candidate.is_nan())
}

fn two_decimals(value: f64) -> String {
    format!("{:.2}", value)
}

/// RMSE, MAE and MAPE on both splits
pub fn model_evaluation(
    y_train: &Array1<f64>,
    y_train_pred: &Array1<f64>,
    y_test: &Array1<f64>,
    y_test_pred: &Array1<f64>,
    model_name: &str,
) -> Result<EvaluationRecord> {
    Ok(EvaluationRecord {
        model: model_name.to_string(),
        train_rmse: two_decimals(rmse(y_train, y_train_pred)?),
        train_mae: two_decimals(mae(y_train, y_train_pred)?),
        train_mape: two_decimals(mape(y_train, y_train_pred)?),
        test_rmse: two_decimals(rmse(y_test, y_test_pred)?),
        test_mae: two_decimals(mae(y_test, y_test_pred)?),
        test_mape: two_decimals(mape(y_test, y_test_pred)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_model_evaluation_formats_two_decimals() {
        let y = array![100.0, 200.0];
        let p = array![110.0, 180.0];
        let record = model_evaluation(&y, &p, &y, &y, "Lasso").unwrap();

        assert_eq!(record.model, "Lasso");
        assert_eq!(record.train_rmse, "15.81");
        assert_eq!(record.train_mae, "15.00");
        assert_eq!(record.train_mape, "0.10");
        assert_eq!(record.test_rmse, "0.00");
        assert_eq!(record.testing_mape(), 0.0);
    }

    #[test]
    fn test_lower_mape() {
        assert!(lower_mape(5.0, 7.0));
        assert!(!lower_mape(7.0, 5.0));
        assert!(!lower_mape(5.0, 5.0));
        assert!(lower_mape(9.0, f64::NAN));
        assert!(!lower_mape(f64::NAN, 9.0));
    }

    #[test]
    fn test_serializes_with_report_headers() {
        let y = array![1.0];
        let record = model_evaluation(&y, &y, &y, &y, "m").unwrap();
        let json = serde_json::to_value(&record).unwrap();
        for header in EvaluationRecord::HEADERS {
            assert!(json.get(header).is_some(), "missing {}", header);
        }
    }
}
