//! Data loading utilities

use crate::error::{CostBenchError, Result};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// CSV loader for benchmarking tables
pub struct DataLoader {
    separator: u8,
    infer_schema_length: Option<usize>,
    deduplicate: bool,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            separator: b',',
            infer_schema_length: Some(10_000),
            deduplicate: true,
        }
    }

    /// Set the field separator
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// Keep exact duplicate rows instead of dropping them
    pub fn keep_duplicates(mut self) -> Self {
        self.deduplicate = false;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| CostBenchError::DataError(format!("{}: {}", path.display(), e)))?;

        let parse_opts = CsvParseOptions::default().with_separator(self.separator);
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| CostBenchError::DataError(e.to_string()))?;

        let n_raw = df.height();
        let df = if self.deduplicate { deduplicate_rows(&df)? } else { df };

        info!(
            path = %path.display(),
            rows = df.height(),
            duplicates_dropped = n_raw - df.height(),
            columns = df.width(),
            "Loaded CSV"
        );
        Ok(df)
    }
}

/// Drop rows identical to an earlier row in every column
pub fn deduplicate_rows(df: &DataFrame) -> Result<DataFrame> {
    let as_text: Vec<Vec<Option<String>>> = df
        .get_columns()
        .iter()
        .map(|col| {
            let text = col.cast(&DataType::String)?;
            let values: Vec<Option<String>> = text
                .as_materialized_series()
                .str()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut seen: HashSet<Vec<Option<String>>> = HashSet::with_capacity(df.height());
    let mask: Vec<bool> = (0..df.height())
        .map(|r| seen.insert(as_text.iter().map(|c| c[r].clone()).collect()))
        .collect();

    let mask = BooleanChunked::from_slice("keep".into(), &mask);
    Ok(df.filter(&mask)?)
}

/// Save DataFrame to CSV
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .finish(df)
            .map_err(|e| CostBenchError::DataError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "name,a,b").unwrap();
        writeln!(file, "x,1,2").unwrap();
        writeln!(file, "y,4,5").unwrap();
        writeln!(file, "x,1,2").unwrap();
        writeln!(file, "z,1,2").unwrap();
        file
    }

    #[test]
    fn test_load_csv_drops_exact_duplicates() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_keep_duplicates() {
        let file = create_test_csv();
        let df = DataLoader::new().keep_duplicates().load_csv(file.path()).unwrap();
        assert_eq!(df.height(), 4);
    }

    #[test]
    fn test_missing_file() {
        let result = DataLoader::new().load_csv("/nonexistent/costs.csv");
        assert!(matches!(result, Err(CostBenchError::DataError(_))));
    }

    #[test]
    fn test_save_csv() {
        let mut df = DataFrame::new(vec![
            Column::new("a".into(), &[1.0, 2.0, 3.0]),
            Column::new("b".into(), &[4.0, 5.0, 6.0]),
        ])
        .unwrap();

        let file = NamedTempFile::new().unwrap();
        DataSaver::save_csv(&mut df, file.path()).unwrap();

        let loaded = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.width(), 2);
    }
}
