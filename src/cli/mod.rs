//! costbench CLI Module
//!
//! Command-line interface for running the benchmarking pipeline on a CSV table.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::evaluation::{EvaluationRecord, ResultsTable};
use crate::feature_engineering::{DatasetVariant, TransformDecision, VariantBuilder, VariantKind};
use crate::modelling::{
    cluster_based_modeling, decision_tree_regression, lasso_ols_regression, lasso_regression,
    random_forest_regression,
};
use crate::preprocessing::prepare_base_data;
use crate::utils::{DataLoader, ParallelConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "costbench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Regression pipeline for network-operator cost benchmarking")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Prepare the data, build the variants and fit every strategy
    Run {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name (overrides the configuration)
        #[arg(short, long)]
        target: Option<String>,

        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Where to write the results table (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Model the raw variant only
        #[arg(long)]
        skip_variants: bool,
    },

    /// Show the column count and transformation decisions of each variant
    Variants {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name (overrides the configuration)
        #[arg(short, long)]
        target: Option<String>,

        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write the default configuration
    Config {
        /// Output file
        #[arg(short, long, default_value = "costbench.json")]
        output: PathBuf,
    },
}

// ─── Shared steps ──────────────────────────────────────────────────────────────

pub fn load_config(path: Option<&Path>, target: Option<&str>) -> anyhow::Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(target) = target {
        config.target = target.to_string();
    }
    config.validate()?;
    Ok(config)
}

fn prepare(data_path: &Path, config: &PipelineConfig) -> anyhow::Result<(Dataset, Dataset)> {
    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run("Preparing train/test split");
    let start = Instant::now();
    let (train, test) = prepare_base_data(&df, config)?;
    step_done(&format!(
        "{} train, {} test, {} features in {:?}",
        train.height(),
        test.height(),
        train.feature_names().len(),
        start.elapsed()
    ));
    Ok((train, test))
}

fn print_record(record: &EvaluationRecord) {
    println!(
        "  {:<36} {:>10} {:>10} {:>8} {:>10} {:>10} {:>8}",
        record.model,
        record.train_rmse,
        record.train_mae,
        record.train_mape,
        record.test_rmse,
        record.test_mae,
        record.test_mape.white().bold()
    );
}

fn print_results(results: &ResultsTable) {
    section("Results");
    println!(
        "  {:<36} {:>10} {:>10} {:>8} {:>10} {:>10} {:>8}",
        muted("Model"),
        muted("Train RMSE"),
        muted("Train MAE"),
        muted("MAPE"),
        muted("Test RMSE"),
        muted("Test MAE"),
        muted("MAPE")
    );
    for record in results.records() {
        print_record(record);
    }
    if let Some(best) = results.best_by_test_mape() {
        println!();
        println!("  {:<16} {} ({})", muted("Best"), best.model.white().bold(), best.test_mape);
    }
}

/// Fit the four strategies on one variant, appending what succeeds
fn run_strategies(variant: &DatasetVariant, config: &PipelineConfig, results: &mut ResultsTable) {
    let name = |strategy: &str| format!("{} {}", variant.name(), strategy);
    let (train, test, outcome) = (&variant.train, &variant.test, Some(variant.outcome_transformation));

    let attempts = [
        ("Lasso", lasso_regression(train, test, &name("Lasso"), outcome, config).map(|o| o.record)),
        ("Lasso OLS", lasso_ols_regression(train, test, &name("Lasso OLS"), outcome, config).map(|o| o.record)),
        ("Random Forest", random_forest_regression(train, test, &name("Random Forest"), outcome, config).map(|o| o.record)),
        ("Decision Tree", decision_tree_regression(train, test, &name("Decision Tree"), outcome, config).map(|o| o.record)),
    ];

    for (strategy, attempt) in attempts {
        match attempt {
            Ok(record) => results.push(record),
            Err(e) => println!("  {:<36} {}", name(strategy), format!("err: {}", e).red()),
        }
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(
    data_path: &Path,
    target: Option<&str>,
    config_path: Option<&Path>,
    output: Option<&Path>,
    skip_variants: bool,
) -> anyhow::Result<()> {
    section("Run");
    let config = load_config(config_path, target)?;
    let (train, test) = prepare(data_path, &config)?;

    step_run("Building variants");
    let start = Instant::now();
    let mut variants = VariantBuilder::from_config(&config).build(&train, &test)?;
    if skip_variants {
        variants.retain(|v| v.kind == VariantKind::Raw);
    }
    step_done(&format!("{} variants in {:?}", variants.len(), start.elapsed()));

    // One pool for every strategy of every variant
    let results = ParallelConfig::from_n_jobs(config.n_jobs).install(|| {
        let mut results = ResultsTable::new();
        for variant in &variants {
            step_run(&format!("Modelling {}", variant.name().cyan()));
            let start = Instant::now();
            let before = results.len();
            run_strategies(variant, &config, &mut results);
            step_done(&format!("{} models in {:?}", results.len() - before, start.elapsed()));
        }

        if let Some(raw) = variants.iter().find(|v| v.kind == VariantKind::Raw) {
            step_run("Cluster-stratified modelling");
            let start = Instant::now();
            match cluster_based_modeling(&raw.train, &raw.test, "cluster_raw", Some(raw.outcome_transformation), &config) {
                Ok(result) => {
                    step_done(&format!("{:?}", start.elapsed()));
                    for skipped in &result.skipped {
                        println!("  {} {} partition skipped: {}", "!".yellow(), skipped.partition, skipped.reason);
                    }
                    results.push(result.record);
                }
                Err(e) => println!("{}", format!("err: {}", e).red()),
            }
        }
        results
    })?;

    print_results(&results);

    if let Some(path) = output {
        results.save_json(path)?;
        println!();
        step_ok(&format!("Results written to {}", path.display()));
    }
    println!();
    Ok(())
}

pub fn cmd_variants(data_path: &Path, target: Option<&str>, config_path: Option<&Path>) -> anyhow::Result<()> {
    section("Variants");
    let config = load_config(config_path, target)?;
    let (train, test) = prepare(data_path, &config)?;

    let (variants, reports) = VariantBuilder::from_config(&config).build_with_reports(&train, &test)?;

    println!();
    println!("  {:<14} {:>8} {:>10}  {}", muted("Variant"), muted("Columns"), muted("Target"), muted("Outcome"));
    for variant in &variants {
        println!(
            "  {:<14} {:>8} {:>10}  {:?}",
            variant.name(),
            variant.train.width(),
            variant.target(),
            variant.outcome_transformation
        );
    }

    let count = |decision: TransformDecision| reports.iter().filter(|r| r.decision == decision).count();
    println!();
    println!("  {:<16} {}", muted("log1p"), count(TransformDecision::Log1p));
    println!("  {:<16} {}", muted("polynomial"), count(TransformDecision::Polynomial));
    println!("  {:<16} {}", muted("unchanged"), count(TransformDecision::Unchanged));
    let warnings = reports.iter().filter(|r| r.warning.is_some()).count();
    if warnings > 0 {
        println!("  {:<16} {}", muted("fit warnings"), warnings.to_string().yellow());
    }
    println!();
    Ok(())
}

pub fn cmd_config(output: &Path) -> anyhow::Result<()> {
    PipelineConfig::default().to_json_file(output)?;
    step_ok(&format!("Default configuration written to {}", output.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["costbench", "run", "--data", "costs.csv", "--skip-variants"]).unwrap();
        match cli.command {
            Commands::Run { data, target, skip_variants, .. } => {
                assert_eq!(data, PathBuf::from("costs.csv"));
                assert!(target.is_none());
                assert!(skip_variants);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_load_config_overrides_target() {
        let config = load_config(None, Some("y")).unwrap();
        assert_eq!(config.target, "y");
    }

    #[test]
    fn test_cmd_config_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        cmd_config(&path).unwrap();
        assert_eq!(PipelineConfig::from_json_file(&path).unwrap(), PipelineConfig::default());
    }
}
