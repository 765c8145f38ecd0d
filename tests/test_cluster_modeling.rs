//! Integration test: cluster partitioning and cluster-stratified modelling

use costbench::config::{ForestGrid, OutcomeTransformation, PipelineConfig};
use costbench::dataset::Dataset;
use costbench::error::CostBenchError;
use costbench::evaluation::EvaluationRecord;
use costbench::modelling::{
    cluster_based_modeling, select_winner, CandidateKind, ClusterPartitioner,
    ClusterStratifiedModeler, PartitionKind,
};
use std::f64::consts::PI;

/// Rows `rows` of a table whose technical columns form a dense blob with
/// every `outlier_every`-th row pushed onto a wide circle
fn technical_data(rows: std::ops::Range<usize>, outlier_every: usize) -> Dataset {
    let mut t1 = Vec::new();
    let mut t2 = Vec::new();
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in rows {
        let (a, b) = if outlier_every > 0 && i % outlier_every == 0 {
            let angle = 2.0 * PI * (i / outlier_every) as f64 / 12.0;
            (30.0 * angle.cos(), 30.0 * angle.sin())
        } else {
            let step = (i % 20) as f64 * 0.05;
            (step, 0.8 * step)
        };
        let driver = 1.0 + (i % 17) as f64;
        t1.push(Some(a));
        t2.push(Some(b));
        x.push(Some(driver));
        y.push(Some(100.0 + 12.0 * driver));
    }
    Dataset::from_columns(
        vec![
            ("t1".to_string(), t1),
            ("t2".to_string(), t2),
            ("x".to_string(), x),
            ("y".to_string(), y),
        ],
        "y",
    )
    .unwrap()
}

fn config() -> PipelineConfig {
    PipelineConfig::default()
        .with_target("y")
        .with_technical_features(["t1", "t2"])
        .with_n_jobs(2)
        .with_forest_grid(ForestGrid {
            n_estimators: vec![10],
            max_depth: vec![None],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
        })
}

fn record(name: &str, test_mape: &str) -> EvaluationRecord {
    EvaluationRecord {
        model: name.to_string(),
        train_rmse: "1.00".into(),
        train_mae: "1.00".into(),
        train_mape: "0.01".into(),
        test_rmse: "1.00".into(),
        test_mae: "1.00".into(),
        test_mape: test_mape.into(),
    }
}

#[test]
fn test_partitions_disjoint_and_within_input() {
    let data = technical_data(0..120, 10);
    let partition = ClusterPartitioner::from_config(&config()).partition(&data).unwrap();

    assert_eq!(partition.core.height(), 108);
    assert_eq!(partition.residual.height(), 12);
    assert_eq!(
        partition.core.height() + partition.residual.height() + partition.n_discarded(),
        data.height()
    );
    assert!(partition.labels.iter().all(|&l| l == 0 || l == -1));
}

#[test]
fn test_winner_selected_by_lowest_test_mape() {
    let a = record("Lasso", "7.00");
    let b = record("Random Forest", "5.00");
    assert_eq!(select_winner(&[&a, &b]), Some(1));

    // Equal scores keep the first candidate
    let c = record("Random Forest", "7.00");
    assert_eq!(select_winner(&[&a, &c]), Some(0));
}

#[test]
fn test_cluster_based_modeling_recombines_both_partitions() {
    let train = technical_data(0..120, 10);
    let test = technical_data(120..180, 10);

    let result = cluster_based_modeling(&train, &test, "raw", None, &config()).unwrap();

    assert!(result.skipped.is_empty());
    let core = result.outcome(PartitionKind::Core).unwrap();
    let residual = result.outcome(PartitionKind::Residual).unwrap();
    assert_eq!(core.n_train, 108);
    assert_eq!(residual.n_train, 12);
    assert_eq!(core.n_test + residual.n_test, 60);
    assert_eq!(core.candidates.len(), CandidateKind::ALL.len());

    let expected = format!(
        "raw_{}_{}",
        core.winner().kind.name(),
        residual.winner().kind.name()
    );
    assert_eq!(result.record.model, expected);
    assert!(result.record.testing_mape() >= 0.0);
    assert!(result.record.testing_mape() < 0.5);
}

#[test]
fn test_empty_residual_partition_is_skipped() {
    // No outliers: every row lands in the core cluster
    let train = technical_data(0..60, 0);
    let test = technical_data(60..80, 0);

    let result = ClusterStratifiedModeler::new(config())
        .run(&train, &test, "raw", Some(OutcomeTransformation::None))
        .unwrap();

    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].partition, PartitionKind::Residual);
    assert!(result.record.model.ends_with("_skipped"));
    assert!(result.outcome(PartitionKind::Residual).is_none());
}

#[test]
fn test_core_without_test_rows_is_skipped() {
    // Four dense test rows are below min_samples, so every test row is noise
    let train = technical_data(0..120, 10);
    let test = technical_data(120..128, 2);

    let result = cluster_based_modeling(&train, &test, "raw", None, &config()).unwrap();

    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].partition, PartitionKind::Core);
    let expected_reason = CostBenchError::EmptyPartition {
        partition: "core".to_string(),
        split: "test".to_string(),
    };
    assert_eq!(result.skipped[0].reason, expected_reason.to_string());
    assert!(result.test_labels.iter().all(|&l| l == -1));

    let residual = result.outcome(PartitionKind::Residual).unwrap();
    assert_eq!(residual.n_train, 12);
    assert_eq!(residual.n_test, 8);
    assert_eq!(
        result.record.model,
        format!("raw_skipped_{}", residual.winner().kind.name())
    );
}

#[test]
fn test_core_error_reported_when_residual_cannot_be_fitted() {
    // One residual train row is fewer than the Lasso folds
    let train = technical_data(1..50, 49);
    let test = technical_data(120..128, 2);

    let err = cluster_based_modeling(&train, &test, "raw", None, &config()).unwrap_err();
    match err {
        CostBenchError::EmptyPartition { partition, split } => {
            assert_eq!(partition, "core");
            assert_eq!(split, "test");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_fails_when_no_partition_can_be_modelled() {
    let train = technical_data(0..4, 2);
    let test = technical_data(4..8, 2);

    // Nothing is dense, so the core error is reported
    let err = cluster_based_modeling(&train, &test, "raw", None, &config()).unwrap_err();
    assert!(matches!(err, CostBenchError::EmptyPartition { .. }));
}
