//! Base train/test preparation for the raw benchmarking table

use super::imputer::KNNImputer;
use super::scaler::StandardScaler;
use super::split::train_test_split;
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::{CostBenchError, Result};
use ndarray::Array2;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Clean, split and impute a raw table.
///
/// Steps, in order:
/// 1. drop the configured identifier/leakage columns that are present
/// 2. drop remaining non-numeric columns
/// 3. drop features where more than `zero_sparsity_threshold` of rows are exactly 0
/// 4. seeded shuffled split
/// 5. standard-scale on train, KNN-impute from training donors, scale back
pub fn prepare_base_data(frame: &DataFrame, config: &PipelineConfig) -> Result<(Dataset, Dataset)> {
    let settings = &config.base;
    let target = config.target.as_str();

    let mut kept: Vec<Column> = Vec::with_capacity(frame.width());
    for col in frame.get_columns() {
        let name = col.name().as_str();
        if settings.drop_columns.iter().any(|d| d == name) {
            debug!(column = %name, "Dropping configured column");
            continue;
        }
        if !is_numeric(col.dtype()) {
            if name == target {
                return Err(CostBenchError::DataError(format!(
                    "target column '{}' is not numeric", target
                )));
            }
            warn!(column = %name, dtype = %col.dtype(), "Dropping non-numeric column");
            continue;
        }
        kept.push(col.clone());
    }

    let dataset = Dataset::new(DataFrame::new(kept)?, target)?;
    let dataset = drop_zero_sparse(&dataset, settings.zero_sparsity_threshold)?;

    let (train, test) = train_test_split(&dataset, settings.test_size, config.random_state)?;
    let (train, test) = impute_scaled(&train, &test, settings.knn_neighbors)?;

    info!(
        train_rows = train.height(),
        test_rows = test.height(),
        columns = train.width(),
        "Prepared base data"
    );
    Ok((train, test))
}

/// Drop features whose share of exact zeros exceeds `threshold`.
///
/// Missing cells do not count as zeros. The target is never dropped.
pub fn drop_zero_sparse(dataset: &Dataset, threshold: f64) -> Result<Dataset> {
    let limit = threshold * dataset.height() as f64;
    let mut sparse = Vec::new();

    for name in dataset.feature_names() {
        let zeros = dataset
            .column_values(&name)?
            .iter()
            .filter(|v| matches!(v, Some(x) if *x == 0.0))
            .count();
        if zeros as f64 > limit {
            sparse.push(name);
        }
    }

    if !sparse.is_empty() {
        info!(dropped = sparse.len(), columns = ?sparse, "Dropping zero-sparse columns");
    }
    dataset.drop_columns(&sparse)
}

/// Scale with train statistics, fill gaps from the `k` nearest training
/// rows in scaled space, then map both splits back to original units.
pub fn impute_scaled(train: &Dataset, test: &Dataset, k: usize) -> Result<(Dataset, Dataset)> {
    let names = train.column_names();
    let train_x = train.feature_matrix(&names)?;
    let test_x = test.feature_matrix(&names)?;

    let mut scaler = StandardScaler::new();
    let train_scaled = scaler.fit_transform(&train_x)?;
    let test_scaled = scaler.transform(&test_x)?;

    let mut imputer = KNNImputer::new(k);
    let train_filled = imputer.fit_transform(&train_scaled)?;
    let test_filled = imputer.transform(&test_scaled)?;

    let train_out = scaler.inverse_transform(&train_filled)?;
    let test_out = scaler.inverse_transform(&test_filled)?;

    Ok((
        from_matrix(&names, &train_out, train.target())?,
        from_matrix(&names, &test_out, test.target())?,
    ))
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64 | DataType::Float32 |
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
    )
}

fn from_matrix(names: &[String], values: &Array2<f64>, target: &str) -> Result<Dataset> {
    let columns: Vec<(String, Vec<Option<f64>>)> = names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let column: Vec<Option<f64>> = values
                .column(j)
                .iter()
                .map(|&v| if v.is_nan() { None } else { Some(v) })
                .collect();
            (name.clone(), column)
        })
        .collect();
    Dataset::from_columns(columns, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        let n = 30;
        let ids: Vec<String> = (0..n).map(|i| format!("op{}", i)).collect();
        let x: Vec<Option<f64>> = (0..n)
            .map(|i| if i % 7 == 3 { None } else { Some(i as f64) })
            .collect();
        let sparse: Vec<f64> = (0..n).map(|i| if i == 0 { 1.0 } else { 0.0 }).collect();
        let y: Vec<f64> = (0..n).map(|i| 3.0 * i as f64 + 1.0).collect();

        df!(
            "NameOrg" => ids.clone(),
            "label" => ids,
            "x" => x,
            "mostly_zero" => sparse,
            "cTOTEXn" => y
        )
        .unwrap()
    }

    #[test]
    fn test_prepare_base_data() {
        let config = PipelineConfig::default();
        let (train, test) = prepare_base_data(&raw_frame(), &config).unwrap();

        assert_eq!(test.height(), 3);
        assert_eq!(train.height(), 27);
        assert_eq!(train.column_names(), vec!["x".to_string(), "cTOTEXn".to_string()]);
        assert_eq!(train.target(), "cTOTEXn");
        assert!(train.columns_with_missing().is_empty());
        assert!(test.columns_with_missing().is_empty());
    }

    #[test]
    fn test_zero_sparse_never_drops_target() {
        let ds = Dataset::from_columns(
            vec![
                ("z".to_string(), vec![Some(0.0), Some(0.0), Some(0.0), Some(1.0)]),
                ("gap".to_string(), vec![None, None, None, Some(0.0)]),
                ("y".to_string(), vec![Some(0.0), Some(0.0), Some(0.0), Some(0.0)]),
            ],
            "y",
        )
        .unwrap();

        let out = drop_zero_sparse(&ds, 0.5).unwrap();
        assert_eq!(out.column_names(), vec!["gap".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_impute_keeps_observed_values() {
        let train = Dataset::from_columns(
            vec![
                ("a".to_string(), vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
                ("b".to_string(), vec![Some(10.0), None, Some(30.0), Some(40.0)]),
                ("y".to_string(), vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            ],
            "y",
        )
        .unwrap();
        let test = train.take_rows(&[0, 1]).unwrap();

        let (train_out, test_out) = impute_scaled(&train, &test, 2).unwrap();
        let a = train_out.column_array("a").unwrap();
        assert!((a[2] - 3.0).abs() < 1e-9);

        // Row 1 is nearest to rows 0 and 2 -> mean of 10 and 30
        let b = test_out.column_array("b").unwrap();
        assert!((b[1] - 20.0).abs() < 1e-9);
    }
}
