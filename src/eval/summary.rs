//! Policy Summary Table
//!
//! Reduces every valid episode of a policy to one row of means and medians.
//! Policies without a single valid episode produce no row at all.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::eval::artifacts::RunArtifacts;
use crate::eval::equity_stats::{mean, median};
use crate::eval::normalize::EpisodeRecord;
use crate::eval::table::TableRow;

/// Fixed column list of `summary_table.csv`.
pub const SUMMARY_COLUMNS: &[&str] = &[
    "policy",
    "n_episodes",
    "mean_final_equity",
    "median_final_equity",
    "mean_max_drawdown",
    "median_max_drawdown",
];

pub fn summary_columns() -> Vec<String> {
    SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Aggregate statistics for one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub policy: String,
    /// Episodes with a valid equity sequence, not raw input count.
    pub n_episodes: usize,
    pub mean_final_equity: f64,
    pub median_final_equity: f64,
    pub mean_max_drawdown: f64,
    pub median_max_drawdown: f64,
}

impl SummaryRow {
    pub fn to_table_row(&self) -> TableRow {
        TableRow::new()
            .with("policy", self.policy.as_str())
            .with("n_episodes", self.n_episodes)
            .with("mean_final_equity", self.mean_final_equity)
            .with("median_final_equity", self.median_final_equity)
            .with("mean_max_drawdown", self.mean_max_drawdown)
            .with("median_max_drawdown", self.median_max_drawdown)
    }
}

/// Summarize one policy's episodes. `None` when no episode is valid.
pub fn summarize_policy(policy: &str, episodes: &[Value]) -> Option<SummaryRow> {
    let mut finals = Vec::with_capacity(episodes.len());
    let mut drawdowns = Vec::with_capacity(episodes.len());

    for (idx, raw) in episodes.iter().enumerate() {
        let stats = EpisodeRecord::new(raw).equity().and_then(|eq| eq.stats());
        match stats {
            Some(s) => {
                finals.push(s.final_value);
                drawdowns.push(s.max_drawdown);
            }
            None => debug!(policy, episode = idx, "Skipping episode without a usable equity curve"),
        }
    }

    if finals.is_empty() {
        return None;
    }

    Some(SummaryRow {
        policy: policy.to_string(),
        n_episodes: finals.len(),
        mean_final_equity: mean(&finals),
        median_final_equity: median(&finals),
        mean_max_drawdown: mean(&drawdowns),
        median_max_drawdown: median(&drawdowns),
    })
}

/// Summary rows for every loaded policy, in priority order.
pub fn build_summary_table(run: &RunArtifacts) -> Vec<SummaryRow> {
    run.policies()
        .iter()
        .filter_map(|p| summarize_policy(&p.name, p.episodes()))
        .collect()
}
