//! Cluster-Stratified Modelling Example
//!
//! Builds a small synthetic cost table, prepares it, builds the dataset
//! variants and runs the cluster-stratified Lasso / random forest selection.

use costbench::prelude::*;
use costbench::config::ForestGrid;
use polars::prelude::*;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "costbench=info".into()),
        )
        .init();

    // 120 operators: a dense technical block plus every tenth one far out
    let n = 120;
    let lines: Vec<f64> = (0..n).map(|i| 10.0 + (i % 13) as f64).collect();
    let cables: Vec<f64> = (0..n).map(|i| 5.0 + (i % 7) as f64).collect();
    let t1: Vec<f64> = (0..n).map(|i| if i % 10 == 0 { 40.0 + i as f64 } else { (i % 5) as f64 * 0.1 }).collect();
    let t2: Vec<f64> = (0..n).map(|i| if i % 10 == 0 { -40.0 - i as f64 } else { (i % 4) as f64 * 0.1 }).collect();
    let cost: Vec<f64> = (0..n).map(|i| 1000.0 + 30.0 * lines[i] + 12.0 * cables[i]).collect();

    let df = DataFrame::new(vec![
        Column::new("lines.N3".into(), &lines),
        Column::new("lines.N6".into(), &cables),
        Column::new("t1".into(), &t1),
        Column::new("t2".into(), &t2),
        Column::new("cTOTEXn".into(), &cost),
    ])?;

    let mut config = PipelineConfig::default()
        .with_technical_features(["t1", "t2"])
        .with_forest_grid(ForestGrid {
            n_estimators: vec![25],
            max_depth: vec![None],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
        });
    config.base.test_size = 0.25;

    let (train, test) = prepare_base_data(&df, &config)?;
    println!("Train rows: {}, test rows: {}", train.height(), test.height());

    let variants = build_variants(&train, &test, &config)?;
    for variant in &variants {
        println!("{:<12} {} columns", variant.name(), variant.train.width());
    }

    let raw = variants
        .iter()
        .find(|v| v.kind == VariantKind::Raw)
        .ok_or_else(|| anyhow::anyhow!("raw variant missing"))?;
    let result = cluster_based_modeling(&raw.train, &raw.test, "raw", Some(raw.outcome_transformation), &config)?;

    println!("\nWinner: {}", result.record.model);
    println!("Test MAPE: {}", result.record.test_mape);
    for skipped in &result.skipped {
        println!("Skipped {} partition: {}", skipped.partition, skipped.reason);
    }

    Ok(())
}
