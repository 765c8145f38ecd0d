//! costbench - Regression modelling for network-operator cost benchmarking
//!
//! This crate turns a table of operator cost drivers into comparable model
//! evaluations:
//! - Base preparation: column filtering, seeded split, KNN imputation
//! - Per-feature log/polynomial transformation and level-band aggregation
//! - Eight dataset variants built from one train/test pair
//! - Lasso, Lasso + OLS, random forest and decision tree strategies
//! - Cluster-stratified modelling over DBSCAN core/residual partitions
//! - Evaluation records, feature rankings and deviation tables
//!
//! # Modules
//!
//! ## Data
//! - [`dataset`] - Numeric table with a designated target column
//! - [`preprocessing`] - Scaling, imputation and base preparation
//! - [`feature_engineering`] - Transformations, aggregation and variants
//!
//! ## Modelling
//! - [`training`] - Regressors, cross-validation, grid search, DBSCAN
//! - [`modelling`] - Strategies and cluster-stratified orchestration
//! - [`evaluation`] - Metrics, records and report tables
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling and configuration
pub mod config;
pub mod error;

// Data
pub mod dataset;
pub mod feature_engineering;
pub mod preprocessing;

// Modelling
pub mod evaluation;
pub mod modelling;
pub mod training;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{CostBenchError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling and configuration
    pub use crate::config::{OutcomeTransformation, PipelineConfig};
    pub use crate::error::{CostBenchError, Result};

    // Data
    pub use crate::dataset::Dataset;
    pub use crate::preprocessing::{prepare_base_data, train_test_split};
    pub use crate::utils::DataLoader;

    // Feature engineering
    pub use crate::feature_engineering::{
        aggregate_groups, build_variants, DatasetVariant, FeatureTransformer, VariantBuilder,
        VariantKind,
    };

    // Modelling
    pub use crate::modelling::{
        cluster_based_modeling, decision_tree_regression, lasso_ols_regression, lasso_regression,
        random_forest_regression, ClusterPartitioner, ClusterStratifiedModeler,
    };

    // Evaluation
    pub use crate::evaluation::{
        model_evaluation, percentage_deviation, variable_frequency, EvaluationRecord,
        ResultsTable,
    };
}
