//! Cluster-stratified modelling
//!
//! Each run goes partition, train candidates, evaluate, select winner,
//! recombine, report. Both partitions are modelled independently by a Lasso
//! and a random forest candidate; the candidate with the lowest test MAPE
//! wins its partition, and the winners' predictions are concatenated (core
//! first) into one final evaluation.

use super::partition::{ClusterPartitioner, Partition, PartitionKind};
use super::strategies::{
    lasso_regression, predict_outcome, random_forest_regression, LassoPredictor, Predictions,
    Predictor, TreePipeline,
};
use crate::config::{OutcomeTransformation, PipelineConfig};
use crate::dataset::{ensure_same_schema, Dataset};
use crate::error::{CostBenchError, Result};
use crate::evaluation::{lower_mape, EvaluationRecord, ImportanceTable};
use crate::training::RandomForest;
use crate::utils::ParallelConfig;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Placeholder for a partition that produced no winner
pub const SKIPPED: &str = "skipped";

/// Candidate families tried on every partition, in tie-break order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateKind {
    Lasso,
    RandomForest,
}

impl CandidateKind {
    pub const ALL: [CandidateKind; 2] = [CandidateKind::Lasso, CandidateKind::RandomForest];

    pub fn name(&self) -> &'static str {
        match self {
            CandidateKind::Lasso => "Lasso",
            CandidateKind::RandomForest => "Random Forest",
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fitted candidate of either family
#[derive(Debug, Clone)]
pub enum FittedCandidate {
    Lasso(LassoPredictor),
    RandomForest(TreePipeline<RandomForest>),
}

impl Predictor for FittedCandidate {
    fn features(&self) -> &[String] {
        match self {
            FittedCandidate::Lasso(m) => m.features(),
            FittedCandidate::RandomForest(m) => m.features(),
        }
    }

    fn predict_matrix(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FittedCandidate::Lasso(m) => m.predict_matrix(x),
            FittedCandidate::RandomForest(m) => m.predict_matrix(x),
        }
    }
}

/// One candidate's fit on one partition
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub kind: CandidateKind,
    pub record: EvaluationRecord,
    pub importance: ImportanceTable,
    pub model: FittedCandidate,
    pub predictions: Predictions,
}

/// Everything produced for one partition
#[derive(Debug, Clone)]
pub struct PartitionOutcome {
    pub partition: PartitionKind,
    pub n_train: usize,
    pub n_test: usize,
    /// In [`CandidateKind::ALL`] order
    pub candidates: Vec<CandidateResult>,
    pub winner: usize,
}

impl PartitionOutcome {
    pub fn winner(&self) -> &CandidateResult {
        &self.candidates[self.winner]
    }
}

/// A partition that could not be modelled, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPartition {
    pub partition: PartitionKind,
    pub reason: String,
}

/// Final result of a cluster-stratified run
#[derive(Debug, Clone)]
pub struct ClusterModelingResult {
    /// Evaluation over the concatenated winner predictions
    pub record: EvaluationRecord,
    /// Outcomes of the partitions that were modelled, core first
    pub outcomes: Vec<PartitionOutcome>,
    pub skipped: Vec<SkippedPartition>,
    pub train_labels: Vec<i64>,
    pub test_labels: Vec<i64>,
}

impl ClusterModelingResult {
    pub fn outcome(&self, kind: PartitionKind) -> Option<&PartitionOutcome> {
        self.outcomes.iter().find(|o| o.partition == kind)
    }
}

/// Index of the record with the lowest test MAPE; the first one wins ties
pub fn select_winner(records: &[&EvaluationRecord]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, record) in records.iter().enumerate() {
        match best {
            Some(b) if !lower_mape(record.testing_mape(), records[b].testing_mape()) => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Runs the per-partition candidates and recombines the winners
#[derive(Debug, Clone)]
pub struct ClusterStratifiedModeler {
    partitioner: ClusterPartitioner,
    config: PipelineConfig,
}

impl ClusterStratifiedModeler {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            partitioner: ClusterPartitioner::from_config(&config),
            config,
        }
    }

    pub fn with_partitioner(mut self, partitioner: ClusterPartitioner) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn partitioner(&self) -> &ClusterPartitioner {
        &self.partitioner
    }

    /// Partition, model both partitions and evaluate the recombined predictions.
    ///
    /// A partition that is empty on either split, or whose candidates all
    /// fail, is skipped with a warning and shows up as `skipped` in the
    /// model name. The run fails only when no partition could be modelled.
    /// `None` as outcome transformation uses the configured one. Every
    /// candidate fit shares one thread pool sized by `n_jobs`.
    pub fn run(
        &self,
        train: &Dataset,
        test: &Dataset,
        model_name: &str,
        outcome_transformation: Option<OutcomeTransformation>,
    ) -> Result<ClusterModelingResult> {
        self.config.validate()?;
        let outcome = self.config.resolve_outcome(outcome_transformation);
        ParallelConfig::from_n_jobs(self.config.n_jobs)
            .install(|| self.run_stages(train, test, model_name, outcome))?
    }

    fn run_stages(
        &self,
        train: &Dataset,
        test: &Dataset,
        model_name: &str,
        outcome_transformation: OutcomeTransformation,
    ) -> Result<ClusterModelingResult> {
        let start = Instant::now();
        ensure_same_schema(train, test, "cluster partitioning")?;

        let train_parts = self.partitioner.partition(train)?;
        let test_parts =
            self.partitioner
                .partition_with_scaler(test, &train_parts.scaler, &train_parts.features)?;

        let mut outcomes = Vec::new();
        let mut skipped = Vec::new();
        let mut first_error = None;

        for kind in PartitionKind::ALL {
            match self.model_partition(kind, &train_parts, &test_parts, outcome_transformation) {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    warn!(partition = %kind, error = %err, "Partition skipped");
                    skipped.push(SkippedPartition {
                        partition: kind,
                        reason: err.to_string(),
                    });
                    first_error.get_or_insert(err);
                }
            }
        }

        if outcomes.is_empty() {
            return Err(first_error.unwrap_or_else(|| {
                CostBenchError::ComputationError("no partition could be modelled".to_string())
            }));
        }

        let winner_name = |kind: PartitionKind| {
            outcomes
                .iter()
                .find(|o| o.partition == kind)
                .map_or(SKIPPED, |o| o.winner().kind.name())
        };
        let name = format!(
            "{}_{}_{}",
            model_name,
            winner_name(PartitionKind::Core),
            winner_name(PartitionKind::Residual)
        );

        let parts: Vec<&Predictions> = outcomes.iter().map(|o| &o.winner().predictions).collect();
        let record = Predictions::concat(&parts)?.evaluate(&name)?;

        info!(
            model = %name,
            test_mape = %record.test_mape,
            skipped = skipped.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cluster-stratified modelling finished"
        );

        Ok(ClusterModelingResult {
            record,
            outcomes,
            skipped,
            train_labels: train_parts.labels,
            test_labels: test_parts.labels,
        })
    }

    fn model_partition(
        &self,
        kind: PartitionKind,
        train_parts: &Partition,
        test_parts: &Partition,
        outcome_transformation: OutcomeTransformation,
    ) -> Result<PartitionOutcome> {
        let train = train_parts.get(kind);
        let test = test_parts.get(kind);
        for (split, data) in [("train", train), ("test", test)] {
            if data.is_empty() {
                return Err(CostBenchError::EmptyPartition {
                    partition: kind.name().to_string(),
                    split: split.to_string(),
                });
            }
        }

        let mut candidates = Vec::with_capacity(CandidateKind::ALL.len());
        for candidate in CandidateKind::ALL {
            let fitted = self.fit_candidate(candidate, train, test, outcome_transformation)?;
            debug!(
                partition = %kind,
                candidate = %candidate,
                test_mape = %fitted.record.test_mape,
                "Candidate evaluated"
            );
            candidates.push(fitted);
        }

        let records: Vec<&EvaluationRecord> = candidates.iter().map(|c| &c.record).collect();
        let winner = select_winner(&records).ok_or_else(|| {
            CostBenchError::ComputationError(format!("no candidate for {} partition", kind))
        })?;

        info!(
            partition = %kind,
            train_rows = train.height(),
            test_rows = test.height(),
            winner = %candidates[winner].kind,
            test_mape = %candidates[winner].record.test_mape,
            "Partition winner selected"
        );

        Ok(PartitionOutcome {
            partition: kind,
            n_train: train.height(),
            n_test: test.height(),
            candidates,
            winner,
        })
    }

    fn fit_candidate(
        &self,
        kind: CandidateKind,
        train: &Dataset,
        test: &Dataset,
        outcome_transformation: OutcomeTransformation,
    ) -> Result<CandidateResult> {
        let (record, importance, model) = match kind {
            CandidateKind::Lasso => {
                let out = lasso_regression(train, test, kind.name(), Some(outcome_transformation), &self.config)?;
                (out.record, out.importance, FittedCandidate::Lasso(out.model))
            }
            CandidateKind::RandomForest => {
                let out = random_forest_regression(train, test, kind.name(), Some(outcome_transformation), &self.config)?;
                (out.record, out.importance, FittedCandidate::RandomForest(out.model))
            }
        };
        let predictions = predict_outcome(&model, train, test, outcome_transformation)?;

        Ok(CandidateResult {
            kind,
            record,
            importance,
            model,
            predictions,
        })
    }
}

/// Cluster-stratified modelling with the partitioner built from `config`
pub fn cluster_based_modeling(
    train: &Dataset,
    test: &Dataset,
    model_name: &str,
    outcome_transformation: Option<OutcomeTransformation>,
    config: &PipelineConfig,
) -> Result<ClusterModelingResult> {
    ClusterStratifiedModeler::new(config.clone()).run(train, test, model_name, outcome_transformation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, test_mape: &str) -> EvaluationRecord {
        EvaluationRecord {
            model: name.to_string(),
            train_rmse: "0.00".into(),
            train_mae: "0.00".into(),
            train_mape: "0.00".into(),
            test_rmse: "0.00".into(),
            test_mae: "0.00".into(),
            test_mape: test_mape.into(),
        }
    }

    #[test]
    fn test_select_winner_lowest_mape() {
        let a = record("Lasso", "7.00");
        let b = record("Random Forest", "5.00");
        assert_eq!(select_winner(&[&a, &b]), Some(1));
        assert_eq!(select_winner(&[&b, &a]), Some(0));
    }

    #[test]
    fn test_select_winner_first_wins_ties() {
        let a = record("Lasso", "0.12");
        let b = record("Random Forest", "0.12");
        assert_eq!(select_winner(&[&a, &b]), Some(0));
    }

    #[test]
    fn test_select_winner_ignores_nan() {
        let a = record("Lasso", "NaN");
        let b = record("Random Forest", "0.50");
        assert_eq!(select_winner(&[&a, &b]), Some(1));
        assert_eq!(select_winner(&[]), None);
    }

    #[test]
    fn test_candidate_names() {
        let names: Vec<&str> = CandidateKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names, vec!["Lasso", "Random Forest"]);
    }
}
