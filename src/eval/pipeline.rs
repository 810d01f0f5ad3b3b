//! Evaluation Pipeline
//!
//! One synchronous pass over a run directory:
//!
//! ```text
//! <run_dir>/<policy>_curves.json ──▶ RunArtifacts
//!        ├──▶ build_summary_table    ──▶ <out_dir>/summary_table.csv
//!        └──▶ build_symbol_failures  ──▶ <out_dir>/symbol_failure_summary.csv
//! ```
//!
//! Both tables are always written. Empty results produce header-only files.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::eval::artifacts::RunArtifacts;
use crate::eval::config::EvalConfig;
use crate::eval::error::{EvalError, EvalResult};
use crate::eval::summary::{build_summary_table, summary_columns, SummaryRow};
use crate::eval::symbol_failure::{
    build_symbol_failures, symbol_failure_columns, BaselineIndex, SymbolFailureRow,
};
use crate::eval::table::{write_table, TableRow};

/// Result of one evaluation pass.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub run_dir: PathBuf,
    pub generated_at: DateTime<Utc>,
    /// Policies whose artifact was found, in priority order.
    pub loaded_policies: Vec<String>,
    pub summary_path: PathBuf,
    pub summary: Vec<SummaryRow>,
    pub symbol_failure_path: PathBuf,
    pub symbol_failures: Vec<SymbolFailureRow>,
}

/// Per-symbol rows for a loaded run. Empty when the treatment artifact is
/// missing.
pub fn symbol_failures_for_run(
    run: &RunArtifacts,
    config: &EvalConfig,
) -> Vec<SymbolFailureRow> {
    let Some(treatment) = run.treatment() else {
        info!(
            treatment = config.treatment().map(|p| p.name.as_str()).unwrap_or("<none>"),
            "No treatment artifact; symbol failure summary will be empty"
        );
        return Vec::new();
    };

    // Baselines without an artifact still get columns, just no matches
    let baselines: Vec<BaselineIndex> = config
        .baselines()
        .map(|spec| {
            let episodes = run.get(&spec.name).map(|a| a.episodes()).unwrap_or(&[]);
            let index = BaselineIndex::build(spec.label(), episodes);
            if index.is_empty() {
                debug!(baseline = %spec.name, "No keyed baseline episodes to match");
            }
            index
        })
        .collect();

    build_symbol_failures(treatment.episodes(), &baselines)
}

/// Run the full evaluation over `run_dir`, writing tables to `out_dir`.
pub fn run_eval(run_dir: &Path, out_dir: &Path, config: &EvalConfig) -> EvalResult<EvalReport> {
    if !run_dir.is_dir() {
        return Err(EvalError::RunDirNotFound(run_dir.to_path_buf()));
    }
    config.validate()?;

    let run = RunArtifacts::load(run_dir, config)?;
    if run.is_empty() {
        warn!("No policy artifacts found in {}", run_dir.display());
    }

    let summary = build_summary_table(&run);
    let summary_path = out_dir.join(&config.summary_file);
    let summary_rows: Vec<TableRow> = summary.iter().map(SummaryRow::to_table_row).collect();
    let written = write_table(&summary_path, &summary_rows, Some(summary_columns().as_slice()))?;
    info!("[ok] wrote {} ({} rows)", summary_path.display(), written);

    let symbol_failures = symbol_failures_for_run(&run, config);
    let symbol_failure_path = out_dir.join(&config.symbol_failure_file);
    let failure_rows: Vec<TableRow> = symbol_failures
        .iter()
        .map(SymbolFailureRow::to_table_row)
        .collect();
    let fixed = symbol_failure_columns(config.baselines().map(|p| p.label()));
    let written = write_table(&symbol_failure_path, &failure_rows, Some(fixed.as_slice()))?;
    info!("[ok] wrote {} ({} rows)", symbol_failure_path.display(), written);

    Ok(EvalReport {
        run_dir: run_dir.to_path_buf(),
        generated_at: Utc::now(),
        loaded_policies: run.policies().iter().map(|p| p.name.clone()).collect(),
        summary_path,
        summary,
        symbol_failure_path,
        symbol_failures,
    })
}
