//! Evaluation CSV Builder
//!
//! Reads the per-policy curve artifacts of one run directory and writes
//! `summary_table.csv` and `symbol_failure_summary.csv`.
//!
//! Usage:
//!   build_eval_csvs --run-dir runs/sprint5_long_train
//!   build_eval_csvs --run-dir runs/sprint4_generalization --out-dir /tmp/eval --json
//!
//! Environment:
//!   EVAL_RUN_DIR - Run directory (default: runs/sprint5_long_train)
//!   EVAL_OUT_DIR - Output directory (default: the run directory)
//!   EVAL_CONFIG  - TOML file with the policy list (default: built-in)
//!   RUST_LOG     - Log filter (default: info)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use earningsedge_eval::eval::{run_eval, EvalConfig};

#[derive(Parser, Debug)]
#[command(name = "build_eval_csvs")]
#[command(about = "Build summary and per-symbol failure tables from episode curve artifacts")]
struct Args {
    /// Run directory holding <policy>_curves.json artifacts
    #[arg(long, env = "EVAL_RUN_DIR", default_value = "runs/sprint5_long_train")]
    run_dir: PathBuf,

    /// Output directory for the CSV tables (defaults to the run directory)
    #[arg(long, env = "EVAL_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Policy configuration file (TOML)
    #[arg(long, env = "EVAL_CONFIG")]
    config: Option<PathBuf>,

    /// Print the evaluation report as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EvalConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EvalConfig::default(),
    };
    let out_dir = args.out_dir.clone().unwrap_or_else(|| args.run_dir.clone());

    info!("Building evaluation tables");
    info!("  Run dir: {}", args.run_dir.display());
    info!("  Out dir: {}", out_dir.display());
    info!(
        "  Policies: {}",
        config
            .policies
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let report = run_eval(&args.run_dir, &out_dir, &config)
        .with_context(|| format!("Evaluation failed for {}", args.run_dir.display()))?;

    info!(
        summary_rows = report.summary.len(),
        symbol_rows = report.symbol_failures.len(),
        "Done"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
