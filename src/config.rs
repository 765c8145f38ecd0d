//! Pipeline configuration
//!
//! Every knob of the pipeline lives in [`PipelineConfig`]. All fields have
//! defaults and can be overridden per call through the `with_*` builders or
//! by loading a JSON file.

use crate::error::{CostBenchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the outcome column was transformed before modelling.
///
/// `Log` means the target holds `ln(1 + y)`; predictions and actuals are
/// mapped back to original units before any metric is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeTransformation {
    #[default]
    None,
    Log,
}

/// Hyperparameter grid for the random forest candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ForestGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100],
            max_depth: vec![None, Some(10)],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1, 2],
        }
    }
}

/// Hyperparameter grid for the single decision tree strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeGrid {
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for TreeGrid {
    fn default() -> Self {
        Self {
            max_depth: vec![Some(10), Some(20), Some(30)],
            min_samples_split: vec![2, 5, 10],
            min_samples_leaf: vec![1, 2, 4],
        }
    }
}

/// Settings for the L1 path search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LassoSearch {
    /// Number of alphas on the regularization path
    pub n_alphas: usize,
    /// Ratio alpha_min / alpha_max
    pub alpha_eps: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LassoSearch {
    fn default() -> Self {
        Self {
            n_alphas: 100,
            alpha_eps: 1e-3,
            max_iter: 10_000,
            tol: 1e-4,
        }
    }
}

/// Settings for turning a raw table into an imputed train/test pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasePreparation {
    /// Identifier and leakage columns removed before modelling
    pub drop_columns: Vec<String>,
    /// Columns with a larger share of exact zeros are dropped
    pub zero_sparsity_threshold: f64,
    pub test_size: f64,
    pub knn_neighbors: usize,
}

impl Default for BasePreparation {
    fn default() -> Self {
        let drop_columns = [
            "yRelativeLowerPower.scaled.corr.N4",
            "yRelativeLowerPower.N4",
            "yRelativeLowerPower.scaled.N4",
            "cTOTEXs",
            "cTOTEXs_RP3",
            "cTOTEXn_RP3",
            "NameOrg",
            "NameShort",
            "dmuName",
            "dmu",
            "dDateData",
            "BNR",
            "BNR_NNR",
        ];
        Self {
            drop_columns: drop_columns.iter().map(|s| s.to_string()).collect(),
            zero_sparsity_threshold: 0.9,
            test_size: 0.1,
            knn_neighbors: 3,
        }
    }
}

/// Technical-block variables used to cluster network operators
pub fn default_technical_features() -> Vec<String> {
    [
        "yCables.all.N13.sum", "yCables.all.N57.sum", "yCables.all.tot",
        "yCables.circuit.N3", "yCables.circuit.N5", "yCables.circuit.N7",
        "yConnections.incl.inj.N1357.sum", "yConnections.other.dso.lower.N1to6.sum",
        "yConnections.other.dso.same.tot",
        "yEnergy.delivered.net.N23.sum", "yEnergy.delivered.net.N2to4.sum",
        "yEnergy.delivered.net.N45.sum", "yEnergy.delivered.net.N5to7.sum",
        "yEnergy.delivered.net.N67.sum", "yEnergy.delivered.net.tot",
        "yInjection.net.N2to4.sum", "yInjection.net.N5to7.sum",
        "yInstalledPower.KWKG.other.tot", "yInstalledPower.N1to4.sum",
        "yInstalledPower.N5to6.sum", "yInstalledPower.N5to7.sum", "yInstalledPower.N7",
        "yInstalledPower.nonsimcurt.N1to4.sum", "yInstalledPower.nonsimcurt.N5to7.sum",
        "yInstalledPower.non.solar.wind.tot",
        "yInstalledPower.reducedAPFI.N1to4.sum", "yInstalledPower.reducedAPFI.N5to7.sum",
        "yInstalledPower.reducedAPFI.tot", "yInstalledPower.renewables.bio.hydro.tot",
        "yInstalledPower.renewables.solar.tot", "yInstalledPower.renewables.solar.wind.tot",
        "yInstalledPower.renewables.wind.tot",
        "yLines.all.N13.sum", "yLines.all.N57.sum", "yLines.all.tot",
        "yLines.circuit.N3", "yLines.circuit.N5", "yLines.circuit.N7",
        "yMeters.cp.ctrl.tot", "yMeters.house.tot", "yMeters.noncp.ctrl.excl.house.tot",
        "yMeters.noncp.ctrl.tot", "yMeters.read.tot",
        "yNet.length.N5", "yNet.length.N7", "yNet.length.all.tot",
        "yPeakload.N4", "yPeakload.N6", "yPeakload.abs.sim.N4",
        "yPeakload.from.higher.sim.N4", "yPeakload.into.higher.sim.N4",
        "yPeakload.into.higher.sim.nett.N6",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Configuration for the whole pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Outcome column
    pub target: String,

    /// Polynomial degree tried for non-skewed features
    pub degree: usize,

    /// Features with a larger training skewness are log1p-transformed
    pub skewness_threshold: f64,

    /// Minimum R² gain for polynomial replacement
    pub improvement_threshold: f64,

    /// Seed for every stochastic step
    pub random_state: u64,

    /// DBSCAN neighbourhood radius (in standardized units)
    pub eps: f64,

    /// DBSCAN density threshold, the point itself included
    pub min_samples: usize,

    /// Cap on features kept by importance-based selection
    pub max_features: usize,

    /// Default outcome transformation for callers that do not use variants
    pub outcome_transformation: OutcomeTransformation,

    /// Folds for every cross-validated search
    pub cv_folds: usize,

    /// Worker threads for searches (None = all cores)
    pub n_jobs: Option<usize>,

    pub lasso: LassoSearch,
    pub forest_grid: ForestGrid,
    pub tree_grid: TreeGrid,

    /// Columns the cluster partitioner standardizes and clusters on
    pub technical_features: Vec<String>,

    /// Name fragments marking pre-aggregated columns
    pub aggregate_markers: Vec<String>,

    pub base: BasePreparation,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target: "cTOTEXn".to_string(),
            degree: 2,
            skewness_threshold: 0.5,
            improvement_threshold: 0.01,
            random_state: 42,
            eps: 0.5,
            min_samples: 5,
            max_features: 20,
            outcome_transformation: OutcomeTransformation::None,
            cv_folds: 5,
            n_jobs: None,
            lasso: LassoSearch::default(),
            forest_grid: ForestGrid::default(),
            tree_grid: TreeGrid::default(),
            technical_features: default_technical_features(),
            aggregate_markers: vec!["tot".to_string(), "sum".to_string()],
            base: BasePreparation::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    pub fn with_skewness_threshold(mut self, threshold: f64) -> Self {
        self.skewness_threshold = threshold;
        self
    }

    pub fn with_improvement_threshold(mut self, threshold: f64) -> Self {
        self.improvement_threshold = threshold;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set DBSCAN parameters
    pub fn with_clustering(mut self, eps: f64, min_samples: usize) -> Self {
        self.eps = eps;
        self.min_samples = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_outcome_transformation(mut self, transformation: OutcomeTransformation) -> Self {
        self.outcome_transformation = transformation;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Builder method to set number of threads
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    pub fn with_technical_features<S: Into<String>>(mut self, features: impl IntoIterator<Item = S>) -> Self {
        self.technical_features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_forest_grid(mut self, grid: ForestGrid) -> Self {
        self.forest_grid = grid;
        self
    }

    pub fn with_tree_grid(mut self, grid: TreeGrid) -> Self {
        self.tree_grid = grid;
        self
    }

    pub fn with_lasso_search(mut self, search: LassoSearch) -> Self {
        self.lasso = search;
        self
    }

    /// The caller's outcome transformation, or the configured one when absent
    pub fn resolve_outcome(&self, outcome: Option<OutcomeTransformation>) -> OutcomeTransformation {
        outcome.unwrap_or(self.outcome_transformation)
    }

    /// Reject values no stage could work with
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &str, value: impl ToString, reason: &str) -> CostBenchError {
            CostBenchError::InvalidParameter {
                name: name.to_string(),
                value: value.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.target.is_empty() {
            return Err(invalid("target", "", "target column name must not be empty"));
        }
        if self.degree < 1 {
            return Err(invalid("degree", self.degree, "must be at least 1"));
        }
        if !(self.eps > 0.0) {
            return Err(invalid("eps", self.eps, "must be positive"));
        }
        if self.min_samples == 0 {
            return Err(invalid("min_samples", self.min_samples, "must be at least 1"));
        }
        if self.max_features == 0 {
            return Err(invalid("max_features", self.max_features, "must be at least 1"));
        }
        if self.cv_folds < 2 {
            return Err(invalid("cv_folds", self.cv_folds, "must be at least 2"));
        }
        if self.n_jobs == Some(0) {
            return Err(invalid("n_jobs", 0, "must be at least 1 when set"));
        }
        if self.lasso.n_alphas == 0 {
            return Err(invalid("lasso.n_alphas", 0, "must be at least 1"));
        }
        if !(self.lasso.alpha_eps > 0.0 && self.lasso.alpha_eps < 1.0) {
            return Err(invalid("lasso.alpha_eps", self.lasso.alpha_eps, "must lie in (0, 1)"));
        }
        if !(self.base.test_size > 0.0 && self.base.test_size < 1.0) {
            return Err(invalid("base.test_size", self.base.test_size, "must lie in (0, 1)"));
        }
        if self.base.knn_neighbors == 0 {
            return Err(invalid("base.knn_neighbors", 0, "must be at least 1"));
        }
        let grid_empty = self.forest_grid.n_estimators.is_empty()
            || self.forest_grid.max_depth.is_empty()
            || self.forest_grid.min_samples_split.is_empty()
            || self.forest_grid.min_samples_leaf.is_empty();
        if grid_empty {
            return Err(CostBenchError::ConfigError("forest grid has an empty axis".to_string()));
        }
        let tree_grid_empty = self.tree_grid.max_depth.is_empty()
            || self.tree_grid.min_samples_split.is_empty()
            || self.tree_grid.min_samples_leaf.is_empty();
        if tree_grid_empty {
            return Err(CostBenchError::ConfigError("tree grid has an empty axis".to_string()));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.degree, 2);
        assert_eq!(config.skewness_threshold, 0.5);
        assert_eq!(config.improvement_threshold, 0.01);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.eps, 0.5);
        assert_eq!(config.min_samples, 5);
        assert_eq!(config.max_features, 20);
        assert_eq!(config.outcome_transformation, OutcomeTransformation::None);
        assert_eq!(config.technical_features.len(), 52);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::new()
            .with_target("y")
            .with_clustering(0.8, 3)
            .with_n_jobs(2)
            .with_technical_features(["a", "b"]);

        assert_eq!(config.target, "y");
        assert_eq!(config.eps, 0.8);
        assert_eq!(config.min_samples, 3);
        assert_eq!(config.n_jobs, Some(2));
        assert_eq!(config.technical_features, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(PipelineConfig::new().with_cv_folds(1).validate().is_err());
        assert!(PipelineConfig::new().with_clustering(0.0, 5).validate().is_err());
        assert!(PipelineConfig::new().with_degree(0).validate().is_err());

        let mut config = PipelineConfig::new();
        config.forest_grid.max_depth.clear();
        assert!(matches!(config.validate(), Err(CostBenchError::ConfigError(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"target": "opex", "outcome_transformation": "log"}"#).unwrap();
        assert_eq!(config.target, "opex");
        assert_eq!(config.outcome_transformation, OutcomeTransformation::Log);
        assert_eq!(config.degree, 2);
        assert_eq!(config.forest_grid, ForestGrid::default());
    }

    #[test]
    fn test_resolve_outcome_falls_back_to_config() {
        let config = PipelineConfig::new().with_outcome_transformation(OutcomeTransformation::Log);
        assert_eq!(config.resolve_outcome(None), OutcomeTransformation::Log);
        assert_eq!(config.resolve_outcome(Some(OutcomeTransformation::None)), OutcomeTransformation::None);
        assert_eq!(PipelineConfig::new().resolve_outcome(None), OutcomeTransformation::None);
    }

    #[test]
    fn test_json_file_round_trip() {
        let tmp = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        let config = PipelineConfig::new().with_target("y").with_max_features(7);
        config.to_json_file(tmp.path()).unwrap();

        let loaded = PipelineConfig::from_json_file(tmp.path()).unwrap();
        assert_eq!(loaded, config);
    }
}
