//! Per-feature transformation decisions
//!
//! Each feature gets exactly one of three treatments, decided on training
//! rows only and then applied to both splits:
//! - `log1p` when the training skewness exceeds the threshold
//! - replacement by a fitted polynomial curve when it beats a straight line
//!   by more than the improvement threshold (in training R²)
//! - nothing otherwise

use super::stats::{distinct_count, skewness};
use crate::config::PipelineConfig;
use crate::dataset::{ensure_same_schema, Dataset};
use crate::error::Result;
use crate::training::PolynomialRegression;
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Fits a one-dimensional polynomial of a given degree
pub trait CurveFitter: Send + Sync {
    fn fit(&self, x: &Array1<f64>, y: &Array1<f64>, degree: usize) -> Result<PolynomialRegression>;
}

/// Ordinary least squares on the (standardized) Vandermonde expansion
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastSquaresFitter;

impl CurveFitter for LeastSquaresFitter {
    fn fit(&self, x: &Array1<f64>, y: &Array1<f64>, degree: usize) -> Result<PolynomialRegression> {
        let mut model = PolynomialRegression::new(degree);
        model.fit(x, y)?;
        Ok(model)
    }
}

/// Treatment chosen for one feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformDecision {
    Log1p,
    Polynomial,
    Unchanged,
}

impl fmt::Display for TransformDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformDecision::Log1p => write!(f, "log1p"),
            TransformDecision::Polynomial => write!(f, "polynomial"),
            TransformDecision::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// What happened to one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformOutcome {
    pub feature: String,
    pub decision: TransformDecision,
    /// Training skewness, `None` for empty or constant columns
    pub skewness: Option<f64>,
    /// `R²(polynomial) - R²(linear)` when the curve fits ran
    pub r2_gain: Option<f64>,
    /// Set when the fits were unusable and the feature was kept as is
    pub warning: Option<String>,
}

/// Transformed train and test values of one feature plus the decision report
#[derive(Debug, Clone)]
pub struct TransformedColumn {
    pub train: Vec<Option<f64>>,
    pub test: Vec<Option<f64>>,
    pub outcome: TransformOutcome,
}

/// Decides and applies log / polynomial transformations feature by feature
pub struct FeatureTransformer<F: CurveFitter = LeastSquaresFitter> {
    degree: usize,
    skewness_threshold: f64,
    improvement_threshold: f64,
    fitter: F,
}

impl Default for FeatureTransformer<LeastSquaresFitter> {
    fn default() -> Self {
        Self::new(2, 0.5, 0.01)
    }
}

impl FeatureTransformer<LeastSquaresFitter> {
    pub fn new(degree: usize, skewness_threshold: f64, improvement_threshold: f64) -> Self {
        Self {
            degree: degree.max(1),
            skewness_threshold,
            improvement_threshold,
            fitter: LeastSquaresFitter,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.degree, config.skewness_threshold, config.improvement_threshold)
    }
}

impl<F: CurveFitter> FeatureTransformer<F> {
    /// Swap the curve fitter, keeping the thresholds
    pub fn with_fitter<G: CurveFitter>(self, fitter: G) -> FeatureTransformer<G> {
        FeatureTransformer {
            degree: self.degree,
            skewness_threshold: self.skewness_threshold,
            improvement_threshold: self.improvement_threshold,
            fitter,
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn fitter(&self) -> &F {
        &self.fitter
    }

    /// Decide the treatment of one feature from its training values and apply
    /// it to both splits. Never fails: unusable fits leave the feature as is.
    pub fn decide_and_apply(
        &self,
        feature: &str,
        train_col: &[Option<f64>],
        test_col: &[Option<f64>],
        train_target: &[Option<f64>],
    ) -> TransformedColumn {
        let skew = skewness(train_col);
        let mut outcome = TransformOutcome {
            feature: feature.to_string(),
            decision: TransformDecision::Unchanged,
            skewness: skew,
            r2_gain: None,
            warning: None,
        };

        if skew.is_some_and(|s| s > self.skewness_threshold) {
            outcome.decision = TransformDecision::Log1p;
            return TransformedColumn {
                train: log1p_column(train_col),
                test: log1p_column(test_col),
                outcome,
            };
        }

        let unchanged = |outcome: TransformOutcome| TransformedColumn {
            train: train_col.to_vec(),
            test: test_col.to_vec(),
            outcome,
        };

        let (x, y): (Vec<f64>, Vec<f64>) = train_col
            .iter()
            .zip(train_target.iter())
            .filter_map(|(x, y)| match (x, y) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
                _ => None,
            })
            .unzip();

        if distinct_count(&x) < self.degree + 1 {
            outcome.warning = Some(format!(
                "{} distinct training values, need {} for a degree-{} fit",
                distinct_count(&x),
                self.degree + 1,
                self.degree
            ));
            warn!(feature = %feature, reason = ?outcome.warning, "Ill-conditioned fit, keeping feature");
            return unchanged(outcome);
        }

        let x = Array1::from(x);
        let y = Array1::from(y);

        let fits = self.fit_line_and_curve(&x, &y);

        let (r2_line, r2_curve, curve) = match fits {
            Ok(fits) => fits,
            Err(e) => {
                outcome.warning = Some(e.to_string());
                warn!(feature = %feature, error = %e, "Ill-conditioned fit, keeping feature");
                return unchanged(outcome);
            }
        };

        let gain = r2_curve - r2_line;
        if !gain.is_finite() {
            outcome.warning = Some("non-finite R² from curve fits".to_string());
            warn!(feature = %feature, "Ill-conditioned fit, keeping feature");
            return unchanged(outcome);
        }
        outcome.r2_gain = Some(gain);

        if gain <= self.improvement_threshold {
            return unchanged(outcome);
        }

        match (predict_column(&curve, train_col), predict_column(&curve, test_col)) {
            (Ok(train), Ok(test)) => {
                outcome.decision = TransformDecision::Polynomial;
                TransformedColumn { train, test, outcome }
            }
            (Err(e), _) | (_, Err(e)) => {
                outcome.warning = Some(e.to_string());
                warn!(feature = %feature, error = %e, "Curve prediction failed, keeping feature");
                unchanged(outcome)
            }
        }
    }

    /// Training R² of a straight line and of the degree-`degree` curve
    fn fit_line_and_curve(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<(f64, f64, PolynomialRegression)> {
        let line = self.fitter.fit(x, y, 1)?;
        let r2_line = line.score(x, y)?;
        let curve = self.fitter.fit(x, y, self.degree)?;
        let r2_curve = curve.score(x, y)?;
        Ok((r2_line, r2_curve, curve))
    }

    /// Apply [`decide_and_apply`](Self::decide_and_apply) to every feature.
    ///
    /// Features are decided in parallel; the target column is left alone.
    pub fn transform_features(&self, train: &Dataset, test: &Dataset) -> Result<(Dataset, Dataset, Vec<TransformOutcome>)> {
        ensure_same_schema(train, test, "transform_features input")?;

        let target = train.target_array()?;
        let target: Vec<Option<f64>> = target.iter().map(|&v| if v.is_nan() { None } else { Some(v) }).collect();

        let features = train.feature_names();
        let columns: Vec<(String, Vec<Option<f64>>, Vec<Option<f64>>)> = features
            .into_iter()
            .map(|name| {
                let tr = train.column_values(&name)?;
                let te = test.column_values(&name)?;
                Ok((name, tr, te))
            })
            .collect::<Result<Vec<_>>>()?;

        let transformed: Vec<TransformedColumn> = columns
            .par_iter()
            .map(|(name, tr, te)| self.decide_and_apply(name, tr, te, &target))
            .collect();

        let mut train_out = train.clone();
        let mut test_out = test.clone();
        let mut reports = Vec::with_capacity(transformed.len());

        for column in transformed {
            let name = column.outcome.feature.clone();
            debug!(
                feature = %name,
                decision = %column.outcome.decision,
                skewness = ?column.outcome.skewness,
                r2_gain = ?column.outcome.r2_gain,
                "Transformation decided"
            );
            if column.outcome.decision != TransformDecision::Unchanged {
                train_out = train_out.with_column(&name, column.train)?;
                test_out = test_out.with_column(&name, column.test)?;
            }
            reports.push(column.outcome);
        }

        let count = |d: TransformDecision| reports.iter().filter(|r| r.decision == d).count();
        info!(
            features = reports.len(),
            log1p = count(TransformDecision::Log1p),
            polynomial = count(TransformDecision::Polynomial),
            "Transformed features"
        );

        ensure_same_schema(&train_out, &test_out, "transform_features output")?;
        Ok((train_out, test_out, reports))
    }
}

/// `ln(1 + v)` per cell; results outside the real domain become missing
pub fn log1p_column(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| v.map(f64::ln_1p).filter(|v| v.is_finite()))
        .collect()
}

fn predict_column(model: &PolynomialRegression, values: &[Option<f64>]) -> Result<Vec<Option<f64>>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let predicted = model.predict(&Array1::from(present))?;

    let mut next = predicted.iter();
    Ok(values
        .iter()
        .map(|v| v.and_then(|_| next.next().copied()))
        .collect())
}
