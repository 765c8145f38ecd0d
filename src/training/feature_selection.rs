//! Importance-based feature selection
//!
//! A reference estimator is fitted on all features; features whose
//! importance reaches the mean importance are kept, at most `max_features`
//! of them, highest importance first. [`SelectThenFit`] chains that
//! selection with a second estimator trained on the kept columns only.

use super::models::Model;
use crate::error::{CostBenchError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Indices (ascending) of the features kept for these importances
pub fn select_by_importance(importances: &Array1<f64>, max_features: usize) -> Vec<usize> {
    if importances.is_empty() {
        return Vec::new();
    }
    let threshold = importances.mean().unwrap_or(0.0);

    let mut ranked: Vec<usize> = (0..importances.len()).collect();
    // Stable sort keeps column order among equal importances
    ranked.sort_by(|&a, &b| {
        importances[b]
            .partial_cmp(&importances[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut support: Vec<usize> = ranked
        .into_iter()
        .take(max_features.max(1))
        .filter(|&i| importances[i] >= threshold)
        .collect();
    support.sort_unstable();
    support
}

/// Select columns by importance, then fit a model on the survivors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectThenFit<M> {
    /// Estimator whose importances drive the selection
    pub selector_estimator: M,
    /// Estimator trained on the selected columns
    pub model: M,
    pub max_features: usize,
    support: Option<Vec<usize>>,
}

impl<M: Model + Clone> SelectThenFit<M> {
    pub fn new(selector_estimator: M, model: M, max_features: usize) -> Self {
        Self {
            selector_estimator,
            model,
            max_features,
            support: None,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        self.selector_estimator.fit(x, y)?;
        let importances = self.selector_estimator.feature_importances().ok_or_else(|| {
            CostBenchError::TrainingError("selector estimator has no feature importances".to_string())
        })?;

        let support = select_by_importance(&importances, self.max_features);
        if support.is_empty() {
            return Err(CostBenchError::TrainingError(
                "importance-based selection kept no features".to_string(),
            ));
        }

        let x_selected = x.select(Axis(1), &support);
        self.model.fit(&x_selected, y)?;
        self.support = Some(support);
        Ok(self)
    }

    /// Column indices of the kept features, ascending
    pub fn support(&self) -> Result<&[usize]> {
        self.support.as_deref().ok_or(CostBenchError::ModelNotFitted)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(x.select(Axis(1), self.support()?))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.model.predict(&self.transform(x)?)
    }

    /// Importances of the final model, aligned with [`Self::support`]
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        self.model.feature_importances()
    }
}
