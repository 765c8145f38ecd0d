//! Caller-owned accumulator of evaluation records

use super::record::{lower_mape, EvaluationRecord};
use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Evaluation records in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    records: Vec<EvaluationRecord>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EvaluationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record with the lowest test MAPE; the earliest wins ties
    pub fn best_by_test_mape(&self) -> Option<&EvaluationRecord> {
        self.records.iter().fold(None, |best: Option<&EvaluationRecord>, r| match best {
            Some(b) if !lower_mape(r.testing_mape(), b.testing_mape()) => Some(b),
            _ => Some(r),
        })
    }

    /// One string column per report header
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = EvaluationRecord::HEADERS
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let values: Vec<&str> = self.records.iter().map(|r| r.cells()[i]).collect();
                Column::new((*header).into(), values)
            })
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl Extend<EvaluationRecord> for ResultsTable {
    fn extend<T: IntoIterator<Item = EvaluationRecord>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}
