//! Regression strategies and cluster-stratified modelling
//!
//! - [`strategies`]: Lasso, Lasso + OLS, random forest and decision tree
//!   fits over a train/test pair, with log outcomes mapped back to
//!   original units before evaluation
//! - [`partition`]: DBSCAN core/residual split on the technical block
//! - [`orchestrator`]: per-partition candidate selection and recombination

pub mod orchestrator;
pub mod partition;
pub mod strategies;

pub use orchestrator::{
    cluster_based_modeling, select_winner, CandidateKind, CandidateResult, ClusterModelingResult,
    ClusterStratifiedModeler, FittedCandidate, PartitionOutcome, SkippedPartition,
};
pub use partition::{ClusterPartitioner, Partition, PartitionKind};
pub use strategies::{
    back_transform, decision_tree_regression, lasso_ols_regression, lasso_regression,
    predict_outcome, random_forest_regression, LassoPredictor, OlsOutput, OlsPredictor,
    OlsSummary, Predictions, Predictor, StrategyOutput, TreePipeline,
};
