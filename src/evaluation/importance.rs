//! Feature rankings, variable frequencies and per-row deviations

use crate::error::{CostBenchError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One ranked feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub feature: String,
    pub score: f64,
}

/// Features ranked by coefficient or importance, highest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceTable {
    /// What the score is ("Coefficient" or "Importance")
    pub score_label: String,
    pub entries: Vec<FeatureScore>,
}

impl ImportanceTable {
    /// Rank `features` by `scores`, descending. Ties keep input order.
    pub fn new(score_label: &str, features: Vec<String>, scores: &Array1<f64>) -> Result<Self> {
        if features.len() != scores.len() {
            return Err(CostBenchError::ShapeError {
                expected: format!("{} scores", features.len()),
                actual: format!("{} scores", scores.len()),
            });
        }
        let mut entries: Vec<FeatureScore> = features
            .into_iter()
            .zip(scores.iter())
            .map(|(feature, &score)| FeatureScore { feature, score })
            .collect();
        entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        Ok(Self {
            score_label: score_label.to_string(),
            entries,
        })
    }

    pub fn features(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.feature.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How often a variable appears across importance tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableCount {
    pub variable: String,
    pub count: usize,
}

/// Variable counts under a caller-chosen column name, most frequent first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTable {
    pub name: String,
    pub entries: Vec<VariableCount>,
}

impl FrequencyTable {
    pub fn count_of(&self, variable: &str) -> Option<usize> {
        self.entries.iter().find(|e| e.variable == variable).map(|e| e.count)
    }
}

/// Count feature occurrences across `tables`.
///
/// Sorted by count, descending; equal counts keep first-seen order.
pub fn variable_frequency(tables: &[ImportanceTable], name: &str) -> FrequencyTable {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for table in tables {
        for entry in &table.entries {
            let count = counts.entry(entry.feature.clone()).or_insert_with(|| {
                order.push(entry.feature.clone());
                0
            });
            *count += 1;
        }
    }

    let mut entries: Vec<VariableCount> = order
        .into_iter()
        .map(|variable| {
            let count = counts.get(&variable).copied().unwrap_or(0);
            VariableCount { variable, count }
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count));

    FrequencyTable {
        name: name.to_string(),
        entries,
    }
}

/// One row of a deviation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deviation {
    /// Position of the row in the input vectors
    pub row: usize,
    pub actual: f64,
    pub predicted: f64,
    /// `|(actual - predicted) / actual| * 100`
    pub percentage: f64,
}

/// Rows ranked by absolute percentage deviation, largest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationTable {
    pub rows: Vec<Deviation>,
}

/// Per-row absolute percentage deviation, sorted descending.
///
/// A zero actual gives an infinite (or NaN for 0/0) deviation; NaN rows sort last.
pub fn percentage_deviation(y_actual: &Array1<f64>, y_pred: &Array1<f64>) -> Result<DeviationTable> {
    if y_actual.len() != y_pred.len() {
        return Err(CostBenchError::ShapeError {
            expected: format!("{} predictions", y_actual.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }

    let mut rows: Vec<Deviation> = y_actual
        .iter()
        .zip(y_pred.iter())
        .enumerate()
        .map(|(row, (&actual, &predicted))| Deviation {
            row,
            actual,
            predicted,
            percentage: ((actual - predicted) / actual).abs() * 100.0,
        })
        .collect();

    rows.sort_by(|a, b| match (a.percentage.is_nan(), b.percentage.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.percentage.total_cmp(&a.percentage),
    });

    Ok(DeviationTable { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn table(features: &[&str]) -> ImportanceTable {
        let scores = Array1::from_iter((0..features.len()).map(|i| (features.len() - i) as f64));
        ImportanceTable::new("Importance", features.iter().map(|s| s.to_string()).collect(), &scores).unwrap()
    }

    #[test]
    fn test_importance_sorted_descending() {
        let t = ImportanceTable::new(
            "Coefficient",
            vec!["a".into(), "b".into(), "c".into()],
            &array![0.5, 2.0, 0.5],
        )
        .unwrap();
        assert_eq!(t.features(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_variable_frequency() {
        let tables = vec![table(&["x", "y"]), table(&["y", "z"]), table(&["y", "x"])];
        let freq = variable_frequency(&tables, "Lasso");

        assert_eq!(freq.name, "Lasso");
        assert_eq!(freq.entries[0], VariableCount { variable: "y".into(), count: 3 });
        assert_eq!(freq.entries[1], VariableCount { variable: "x".into(), count: 2 });
        assert_eq!(freq.count_of("z"), Some(1));
        assert_eq!(freq.count_of("w"), None);
    }

    #[test]
    fn test_percentage_deviation() {
        let table = percentage_deviation(&array![100.0, 50.0, 0.0, 10.0], &array![90.0, 75.0, 0.0, 10.0]).unwrap();

        let order: Vec<usize> = table.rows.iter().map(|r| r.row).collect();
        assert_eq!(order, vec![1, 0, 3, 2]);
        assert!((table.rows[0].percentage - 50.0).abs() < 1e-12);
        assert!((table.rows[1].percentage - 10.0).abs() < 1e-12);
        assert!(table.rows[3].percentage.is_nan());
    }
}
