//! Feature engineering module
//!
//! Per-feature log/polynomial transformation, level-band aggregation and the
//! fixed menu of dataset variants derived from them.

pub mod aggregation;
mod stats;
pub mod transformer;
pub mod variants;

pub use aggregation::{aggregate_groups, drop_marked_columns, level_member, AggregateNaming};
pub use stats::{distinct_count, skewness};
pub use transformer::{
    log1p_column, CurveFitter, FeatureTransformer, LeastSquaresFitter, TransformDecision,
    TransformOutcome, TransformedColumn,
};
pub use variants::{build_variants, with_log_target, DatasetVariant, VariantBuilder, VariantKind};
