//! Dataset variants built from one base train/test pair

use super::aggregation::{aggregate_groups, drop_marked_columns, AggregateNaming};
use super::transformer::{log1p_column, FeatureTransformer, TransformOutcome};
use crate::config::{OutcomeTransformation, PipelineConfig};
use crate::dataset::{ensure_same_schema, Dataset};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// The eight derivations of the base data, in build order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// Base data as is
    Raw,
    /// Transformed features
    XLog,
    /// Transformed features and log outcome
    XLogYLog,
    /// Log outcome only
    YLog,
    /// Only pre-computed totals
    Agg,
    /// Totals from the transformed, log-outcome data
    AggLog,
    /// Everything except totals
    NonAgg,
    /// Level bands summed, totals removed
    GroupAgg,
}

impl VariantKind {
    pub const ALL: [VariantKind; 8] = [
        VariantKind::Raw,
        VariantKind::XLog,
        VariantKind::XLogYLog,
        VariantKind::YLog,
        VariantKind::Agg,
        VariantKind::AggLog,
        VariantKind::NonAgg,
        VariantKind::GroupAgg,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VariantKind::Raw => "raw",
            VariantKind::XLog => "x_log",
            VariantKind::XLogYLog => "x_log_y_log",
            VariantKind::YLog => "y_log",
            VariantKind::Agg => "agg",
            VariantKind::AggLog => "agg_log",
            VariantKind::NonAgg => "non_agg",
            VariantKind::GroupAgg => "group_agg",
        }
    }

    /// Whether the outcome of this variant is on the log scale
    pub fn outcome_transformation(&self) -> OutcomeTransformation {
        match self {
            VariantKind::XLogYLog | VariantKind::YLog | VariantKind::AggLog => OutcomeTransformation::Log,
            _ => OutcomeTransformation::None,
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One train/test pair ready for modelling
#[derive(Debug, Clone)]
pub struct DatasetVariant {
    pub kind: VariantKind,
    pub train: Dataset,
    pub test: Dataset,
    pub outcome_transformation: OutcomeTransformation,
}

impl DatasetVariant {
    fn new(kind: VariantKind, train: Dataset, test: Dataset) -> Result<Self> {
        ensure_same_schema(&train, &test, kind.name())?;
        Ok(Self {
            kind,
            train,
            test,
            outcome_transformation: kind.outcome_transformation(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn target(&self) -> &str {
        self.train.target()
    }
}

/// Name of the log-scale outcome column
pub fn log_target_name(target: &str) -> String {
    format!("{}_log", target)
}

/// Replace the outcome by `log1p(outcome)` under the name `<target>_log`
pub fn with_log_target(dataset: &Dataset) -> Result<Dataset> {
    let name = log_target_name(dataset.target());
    let logged = log1p_column(&dataset.column_values(dataset.target())?);
    dataset.with_column(&name, logged)?.replace_target(&name)
}

/// Builds the fixed menu of dataset variants
pub struct VariantBuilder {
    transformer: FeatureTransformer,
    naming: AggregateNaming,
}

impl Default for VariantBuilder {
    fn default() -> Self {
        Self {
            transformer: FeatureTransformer::default(),
            naming: AggregateNaming::default(),
        }
    }
}

impl VariantBuilder {
    pub fn new(transformer: FeatureTransformer, naming: AggregateNaming) -> Self {
        Self { transformer, naming }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(FeatureTransformer::from_config(config), AggregateNaming::from_config(config))
    }

    /// All eight variants in [`VariantKind::ALL`] order
    pub fn build(&self, train: &Dataset, test: &Dataset) -> Result<Vec<DatasetVariant>> {
        self.build_with_reports(train, test).map(|(variants, _)| variants)
    }

    /// Variants plus the per-feature transformation reports of the `x_log` step
    pub fn build_with_reports(&self, train: &Dataset, test: &Dataset) -> Result<(Vec<DatasetVariant>, Vec<TransformOutcome>)> {
        ensure_same_schema(train, test, "variant input")?;
        let naming = &self.naming;

        let (train_xlog, test_xlog, reports) = self.transformer.transform_features(train, test)?;
        let train_xlog_ylog = with_log_target(&train_xlog)?;
        let test_xlog_ylog = with_log_target(&test_xlog)?;

        let mut variants = Vec::with_capacity(VariantKind::ALL.len());
        for kind in VariantKind::ALL {
            let (tr, te) = match kind {
                VariantKind::Raw => (train.clone(), test.clone()),
                VariantKind::XLog => (train_xlog.clone(), test_xlog.clone()),
                VariantKind::XLogYLog => (train_xlog_ylog.clone(), test_xlog_ylog.clone()),
                VariantKind::YLog => (with_log_target(train)?, with_log_target(test)?),
                VariantKind::Agg => (
                    train.retain_columns(|c| naming.is_aggregate(c))?,
                    test.retain_columns(|c| naming.is_aggregate(c))?,
                ),
                VariantKind::AggLog => (
                    train_xlog_ylog.retain_columns(|c| naming.mentions_aggregate(c))?,
                    test_xlog_ylog.retain_columns(|c| naming.mentions_aggregate(c))?,
                ),
                VariantKind::NonAgg => (
                    train.retain_columns(|c| !naming.mentions_aggregate(c))?,
                    test.retain_columns(|c| !naming.mentions_aggregate(c))?,
                ),
                VariantKind::GroupAgg => (
                    drop_marked_columns(&aggregate_groups(train)?, naming)?,
                    drop_marked_columns(&aggregate_groups(test)?, naming)?,
                ),
            };

            let variant = DatasetVariant::new(kind, tr, te)?;
            info!(
                variant = %kind,
                target = %variant.target(),
                columns = variant.train.width(),
                "Variant built"
            );
            variants.push(variant);
        }

        Ok((variants, reports))
    }
}

/// Build the eight variants with the thresholds and markers of `config`
pub fn build_variants(train: &Dataset, test: &Dataset, config: &PipelineConfig) -> Result<Vec<DatasetVariant>> {
    VariantBuilder::from_config(config).build(train, test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CostBenchError;
    use crate::feature_engineering::TransformDecision;

    fn pair() -> (Dataset, Dataset) {
        let column = |f: fn(f64) -> f64, n: usize| -> Vec<Option<f64>> {
            (0..n).map(|i| Some(f(i as f64))).collect()
        };
        let build = |n: usize| {
            Dataset::from_columns(
                vec![
                    ("lines.N1".to_string(), column(|i| i + 1.0, n)),
                    ("lines.N5".to_string(), column(|i| 2.0 * i, n)),
                    ("lines_tot".to_string(), column(|i| 3.0 * i + 1.0, n)),
                    ("skewed".to_string(), column(|i| (i * 0.7).exp(), n)),
                    ("cTOTEXn".to_string(), column(|i| 10.0 + 4.0 * i, n)),
                ],
                "cTOTEXn",
            )
            .unwrap()
        };
        (build(12), build(4))
    }

    #[test]
    fn test_builds_eight_variants_in_order() {
        let (train, test) = pair();
        let variants = VariantBuilder::default().build(&train, &test).unwrap();

        let names: Vec<&str> = variants.iter().map(|v| v.name()).collect();
        assert_eq!(
            names,
            vec!["raw", "x_log", "x_log_y_log", "y_log", "agg", "agg_log", "non_agg", "group_agg"]
        );
        for v in &variants {
            assert_eq!(v.train.column_names(), v.test.column_names());
            assert_eq!(v.train.height(), 12);
            assert_eq!(v.test.height(), 4);
        }
    }

    #[test]
    fn test_variant_columns() {
        let (train, test) = pair();
        let variants = VariantBuilder::default().build(&train, &test).unwrap();

        assert_eq!(variants[2].target(), "cTOTEXn_log");
        assert!(!variants[2].train.has_column("cTOTEXn"));
        assert_eq!(variants[3].outcome_transformation, OutcomeTransformation::Log);
        assert_eq!(variants[0].outcome_transformation, OutcomeTransformation::None);

        assert_eq!(variants[4].train.column_names(), vec!["lines_tot", "cTOTEXn"]);
        assert_eq!(variants[5].train.column_names(), vec!["lines_tot", "cTOTEXn_log"]);
        assert_eq!(
            variants[6].train.column_names(),
            vec!["lines.N1", "lines.N5", "skewed", "cTOTEXn"]
        );
        assert_eq!(
            variants[7].train.column_names(),
            vec!["skewed", "cTOTEXn", "lines_agg_N1to4", "lines_agg_N5to7"]
        );
    }

    #[test]
    fn test_skewed_feature_logged_in_x_log() {
        let (train, test) = pair();
        let (variants, reports) = VariantBuilder::default().build_with_reports(&train, &test).unwrap();

        let skewed = reports.iter().find(|r| r.feature == "skewed").unwrap();
        assert_eq!(skewed.decision, TransformDecision::Log1p);

        let raw = test.column_values("skewed").unwrap();
        let logged = variants[1].test.column_values("skewed").unwrap();
        for (r, l) in raw.iter().zip(logged.iter()) {
            assert!((r.unwrap().ln_1p() - l.unwrap()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_schema_mismatch_is_rejected() {
        let (train, test) = pair();
        let test = test.drop_columns(&["skewed".to_string()]).unwrap();
        let err = VariantBuilder::default().build(&train, &test).unwrap_err();
        assert!(matches!(err, CostBenchError::SchemaMismatch { .. }));
    }
}
