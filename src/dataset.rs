//! Numeric table with a designated outcome column
//!
//! [`Dataset`] wraps a polars `DataFrame` whose columns are all `Float64`.
//! Nulls are missing values. Every operation returns a new dataset and
//! leaves its input untouched, so train/test lineage stays traceable.

use crate::error::{CostBenchError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::{BTreeSet, HashSet};

/// Named numeric columns plus the name of the target column
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    target: String,
}

impl Dataset {
    /// Wrap a frame, casting integer and float32 columns to `Float64`.
    ///
    /// Fails if the target is absent or a column is not numeric.
    pub fn new(frame: DataFrame, target: impl Into<String>) -> Result<Self> {
        let target = target.into();
        let mut columns: Vec<Column> = Vec::with_capacity(frame.width());

        for col in frame.get_columns() {
            let casted = match col.dtype() {
                DataType::Float64 => col.clone(),
                DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
                DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 |
                DataType::Float32 => col.cast(&DataType::Float64)?,
                other => {
                    return Err(CostBenchError::DataError(format!(
                        "column '{}' has non-numeric type {}", col.name(), other
                    )));
                }
            };
            columns.push(casted);
        }

        let frame = DataFrame::new(columns)?;
        if frame.column(&target).is_err() {
            return Err(CostBenchError::FeatureNotFound(target));
        }

        Ok(Self { frame, target })
    }

    /// Build a dataset from named value vectors (all the same length)
    pub fn from_columns(columns: Vec<(String, Vec<Option<f64>>)>, target: impl Into<String>) -> Result<Self> {
        let target = target.into();
        let height = columns.first().map(|(_, v)| v.len()).unwrap_or(0);

        let mut seen = HashSet::new();
        let mut built: Vec<Column> = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            if values.len() != height {
                return Err(CostBenchError::ShapeError {
                    expected: format!("{} rows in column '{}'", height, name),
                    actual: format!("{} rows", values.len()),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(CostBenchError::DataError(format!("duplicate column '{}'", name)));
            }
            built.push(Series::new(name.as_str().into(), values).into());
        }

        if !seen.contains(&target) {
            return Err(CostBenchError::FeatureNotFound(target));
        }

        Ok(Self { frame: DataFrame::new(built)?, target })
    }

    /// Underlying frame
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Name of the outcome column
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Number of columns, target included
    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    /// All column names in frame order
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Column names except the target, in frame order
    pub fn feature_names(&self) -> Vec<String> {
        self.column_names()
            .into_iter()
            .filter(|name| name != &self.target)
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Raw cell values of one column
    pub fn column_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| CostBenchError::FeatureNotFound(name.to_string()))?;
        let values = column
            .as_materialized_series()
            .f64()
            .map_err(|e| CostBenchError::DataError(e.to_string()))?
            .into_iter()
            .collect();
        Ok(values)
    }

    /// One column as a dense array, missing cells as NaN
    pub fn column_array(&self, name: &str) -> Result<Array1<f64>> {
        Ok(self
            .column_values(name)?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }

    /// Target column as a dense array, missing cells as NaN
    pub fn target_array(&self) -> Result<Array1<f64>> {
        self.column_array(&self.target)
    }

    /// Extract named columns into a row-major matrix; missing cells as NaN
    pub fn feature_matrix(&self, names: &[String]) -> Result<Array2<f64>> {
        let n_rows = self.height();
        let col_data: Vec<Array1<f64>> = names
            .iter()
            .map(|name| self.column_array(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Array2::from_shape_fn((n_rows, names.len()), |(r, c)| col_data[c][r]))
    }

    /// Replace a column, or append it if absent
    pub fn with_column(&self, name: &str, values: Vec<Option<f64>>) -> Result<Self> {
        if values.len() != self.height() {
            return Err(CostBenchError::ShapeError {
                expected: format!("{} rows", self.height()),
                actual: format!("{} rows for column '{}'", values.len(), name),
            });
        }
        let mut frame = self.frame.clone();
        frame.with_column(Series::new(name.into(), values))?;
        Ok(Self { frame, target: self.target.clone() })
    }

    /// Remove columns; names not present are ignored. The target cannot be removed.
    pub fn drop_columns(&self, names: &[String]) -> Result<Self> {
        if names.iter().any(|n| n == &self.target) {
            return Err(CostBenchError::ValidationError(format!(
                "cannot drop target column '{}'", self.target
            )));
        }
        let drop: HashSet<&str> = names.iter().map(|s| s.as_str()).collect();
        self.retain_columns(|name| !drop.contains(name))
    }

    /// Keep the columns accepted by `keep`; the target is always kept
    pub fn retain_columns<F>(&self, keep: F) -> Result<Self>
    where
        F: Fn(&str) -> bool,
    {
        let columns: Vec<Column> = self
            .frame
            .get_columns()
            .iter()
            .filter(|col| col.name().as_str() == self.target || keep(col.name().as_str()))
            .cloned()
            .collect();
        Ok(Self { frame: DataFrame::new(columns)?, target: self.target.clone() })
    }

    /// Keep exactly these columns, in this order (the target is appended if missing)
    pub fn select_columns(&self, names: &[String]) -> Result<Self> {
        let mut columns: Vec<Column> = Vec::with_capacity(names.len() + 1);
        for name in names {
            let column = self
                .frame
                .column(name)
                .map_err(|_| CostBenchError::FeatureNotFound(name.clone()))?;
            columns.push(column.clone());
        }
        if !names.iter().any(|n| n == &self.target) {
            columns.push(self.frame.column(&self.target)?.clone());
        }
        Ok(Self { frame: DataFrame::new(columns)?, target: self.target.clone() })
    }

    /// Remove the current target column and make `new_target` the outcome
    pub fn replace_target(&self, new_target: &str) -> Result<Self> {
        if !self.has_column(new_target) {
            return Err(CostBenchError::FeatureNotFound(new_target.to_string()));
        }
        let old = self.target.clone();
        let columns: Vec<Column> = self
            .frame
            .get_columns()
            .iter()
            .filter(|col| col.name().as_str() != old)
            .cloned()
            .collect();
        Ok(Self { frame: DataFrame::new(columns)?, target: new_target.to_string() })
    }

    /// Rows at the given positions, in the given order
    pub fn take_rows(&self, indices: &[usize]) -> Result<Self> {
        let height = self.height();
        if let Some(&bad) = indices.iter().find(|&&i| i >= height) {
            return Err(CostBenchError::ShapeError {
                expected: format!("row index < {}", height),
                actual: bad.to_string(),
            });
        }

        let mut columns: Vec<Column> = Vec::with_capacity(self.width());
        for name in self.column_names() {
            let values = self.column_values(&name)?;
            let picked: Vec<Option<f64>> = indices.iter().map(|&i| values[i]).collect();
            columns.push(Series::new(name.as_str().into(), picked).into());
        }
        Ok(Self { frame: DataFrame::new(columns)?, target: self.target.clone() })
    }

    /// Rows where `mask` is true
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.height() {
            return Err(CostBenchError::ShapeError {
                expected: format!("mask of length {}", self.height()),
                actual: mask.len().to_string(),
            });
        }
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();
        self.take_rows(&indices)
    }

    /// Drop exact duplicate rows, keeping the first occurrence
    pub fn deduplicate_rows(&self) -> Result<Self> {
        let columns: Vec<Vec<Option<f64>>> = self
            .column_names()
            .iter()
            .map(|name| self.column_values(name))
            .collect::<Result<Vec<_>>>()?;

        let mut seen: HashSet<Vec<Option<u64>>> = HashSet::new();
        let keep: Vec<bool> = (0..self.height())
            .map(|r| {
                let key: Vec<Option<u64>> = columns.iter().map(|c| c[r].map(f64::to_bits)).collect();
                seen.insert(key)
            })
            .collect();
        self.filter_rows(&keep)
    }

    /// Names of columns holding at least one missing cell
    pub fn columns_with_missing(&self) -> Vec<String> {
        self.frame
            .get_columns()
            .iter()
            .filter(|col| col.null_count() > 0)
            .map(|col| col.name().to_string())
            .collect()
    }
}

/// Fail with `SchemaMismatch` unless train and test carry the same column set
pub fn ensure_same_schema(train: &Dataset, test: &Dataset, stage: &str) -> Result<()> {
    let train_cols: BTreeSet<String> = train.column_names().into_iter().collect();
    let test_cols: BTreeSet<String> = test.column_names().into_iter().collect();

    if train_cols == test_cols && train.target() == test.target() {
        return Ok(());
    }

    Err(CostBenchError::SchemaMismatch {
        stage: stage.to_string(),
        train_only: train_cols.difference(&test_cols).cloned().collect(),
        test_only: test_cols.difference(&train_cols).cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let df = df!(
            "a" => &[1.0, 2.0, 3.0, 4.0],
            "b" => &[10i64, 20, 30, 40],
            "y" => &[0.5, 1.5, 2.5, 3.5]
        )
        .unwrap();
        Dataset::new(df, "y").unwrap()
    }

    #[test]
    fn test_new_casts_integers() {
        let ds = sample();
        assert_eq!(ds.frame().column("b").unwrap().dtype(), &DataType::Float64);
        assert_eq!(ds.feature_names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ds.height(), 4);
    }

    #[test]
    fn test_missing_target_rejected() {
        let df = df!("a" => &[1.0, 2.0]).unwrap();
        assert!(matches!(Dataset::new(df, "y"), Err(CostBenchError::FeatureNotFound(_))));
    }

    #[test]
    fn test_non_numeric_rejected() {
        let df = df!("name" => &["x", "y"], "y" => &[1.0, 2.0]).unwrap();
        assert!(matches!(Dataset::new(df, "y"), Err(CostBenchError::DataError(_))));
    }

    #[test]
    fn test_with_column_leaves_input_untouched() {
        let ds = sample();
        let changed = ds.with_column("a", vec![Some(0.0); 4]).unwrap();
        assert_eq!(ds.column_values("a").unwrap()[0], Some(1.0));
        assert_eq!(changed.column_values("a").unwrap()[0], Some(0.0));
    }

    #[test]
    fn test_retain_always_keeps_target() {
        let ds = sample();
        let kept = ds.retain_columns(|_| false).unwrap();
        assert_eq!(kept.column_names(), vec!["y".to_string()]);
    }

    #[test]
    fn test_drop_target_is_error() {
        let ds = sample();
        assert!(ds.drop_columns(&["y".to_string()]).is_err());
    }

    #[test]
    fn test_filter_rows() {
        let ds = sample();
        let filtered = ds.filter_rows(&[true, false, true, false]).unwrap();
        assert_eq!(filtered.height(), 2);
        assert_eq!(filtered.column_values("b").unwrap(), vec![Some(10.0), Some(30.0)]);
    }

    #[test]
    fn test_feature_matrix_layout() {
        let ds = sample();
        let x = ds.feature_matrix(&ds.feature_names()).unwrap();
        assert_eq!(x.dim(), (4, 2));
        assert_eq!(x[[2, 0]], 3.0);
        assert_eq!(x[[2, 1]], 30.0);
    }

    #[test]
    fn test_replace_target() {
        let ds = sample().with_column("y_log", vec![Some(1.0); 4]).unwrap();
        let replaced = ds.replace_target("y_log").unwrap();
        assert_eq!(replaced.target(), "y_log");
        assert!(!replaced.has_column("y"));
    }

    #[test]
    fn test_deduplicate_rows() {
        let df = df!("a" => &[1.0, 1.0, 2.0], "y" => &[3.0, 3.0, 3.0]).unwrap();
        let ds = Dataset::new(df, "y").unwrap().deduplicate_rows().unwrap();
        assert_eq!(ds.height(), 2);
    }

    #[test]
    fn test_schema_mismatch_reports_differences() {
        let train = sample();
        let test = sample().drop_columns(&["b".to_string()]).unwrap();
        match ensure_same_schema(&train, &test, "unit") {
            Err(CostBenchError::SchemaMismatch { train_only, test_only, .. }) => {
                assert_eq!(train_only, vec!["b".to_string()]);
                assert!(test_only.is_empty());
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }
}
