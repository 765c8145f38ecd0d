//! costbench - Main Entry Point
//!
//! Cost benchmarking regression pipeline on the command line.

use clap::Parser;
use costbench::cli::{cmd_config, cmd_run, cmd_variants, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "costbench=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { data, target, config, output, skip_variants } => {
            cmd_run(&data, target.as_deref(), config.as_deref(), output.as_deref(), skip_variants)?;
        }
        Commands::Variants { data, target, config } => {
            cmd_variants(&data, target.as_deref(), config.as_deref())?;
        }
        Commands::Config { output } => {
            cmd_config(&output)?;
        }
    }

    Ok(())
}
