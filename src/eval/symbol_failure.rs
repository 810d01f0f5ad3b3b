//! Per-Symbol Failure Summary
//!
//! Buckets treatment episodes by symbol and compares each episode against its
//! counterpart in every baseline run.
//!
//! # Matching
//!
//! ```text
//! treatment ep ──identity key──▶ BaselineIndex[label] ──▶ baseline stats
//!      │                                                     │
//!      └── delta_final  = treat.final - base.final ◀─────────┤
//!          dd_improve   = base.mdd    - treat.mdd  ◀─────────┘
//! ```
//!
//! An unmatched episode still counts toward `n_pairs` and `failures`; it only
//! drops out of that baseline's means. Baseline indexes are built in document
//! order and duplicate keys are last-write-wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::eval::equity_stats::{mean, EpisodeStats};
use crate::eval::normalize::EpisodeRecord;
use crate::eval::table::TableRow;

/// Leading columns of `symbol_failure_summary.csv`.
pub const SYMBOL_FAILURE_BASE_COLUMNS: &[&str] = &[
    "symbol",
    "n_pairs",
    "fail_rate",
    "failures",
    "reason",
    "flags",
    "failure_flags",
    "primary_flag",
];

pub fn delta_final_column(label: &str) -> String {
    format!("mean_delta_eq_vs_{}", label)
}

pub fn drawdown_improvement_column(label: &str) -> String {
    format!("mean_dd_improve_vs_{}", label)
}

/// Fixed header for the given baseline labels, used when there are no rows.
pub fn symbol_failure_columns<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut columns: Vec<String> = SYMBOL_FAILURE_BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .collect();
    for label in labels {
        columns.push(delta_final_column(label));
        columns.push(drawdown_improvement_column(label));
    }
    columns
}

// =============================================================================
// BASELINE INDEX
// =============================================================================

/// Identity key -> statistics for one baseline policy.
///
/// Records without a key are left out. A key seen twice keeps the later
/// record, even if that record has no usable curve.
#[derive(Debug, Clone, Default)]
pub struct BaselineIndex {
    pub label: String,
    by_key: HashMap<String, Option<EpisodeStats>>,
}

impl BaselineIndex {
    pub fn build(label: &str, episodes: &[Value]) -> Self {
        let mut by_key = HashMap::with_capacity(episodes.len());
        let mut duplicates = 0usize;
        for raw in episodes {
            let record = EpisodeRecord::new(raw);
            let Some(key) = record.identity_key() else {
                continue;
            };
            let stats = record.equity().and_then(|eq| eq.stats());
            if by_key.insert(key, stats).is_some() {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            warn!(baseline = label, duplicates, "Duplicate identity keys; later episodes win");
        }
        Self {
            label: label.to_string(),
            by_key,
        }
    }

    /// Statistics of the matched baseline episode, when it has a valid curve.
    pub fn lookup(&self, key: &str) -> Option<EpisodeStats> {
        self.by_key.get(key).copied().flatten()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

// =============================================================================
// ROWS
// =============================================================================

/// Mean deltas of one symbol against one baseline. NaN when nothing matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub label: String,
    /// Episodes that contributed a match.
    pub matched: usize,
    pub mean_delta_final: f64,
    pub mean_drawdown_improvement: f64,
}

/// One row of the symbol failure summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolFailureRow {
    pub symbol: String,
    pub n_pairs: usize,
    pub failures: usize,
    pub fail_rate: f64,
    /// Annotation columns, reserved for downstream tooling. Always empty.
    pub reason: String,
    pub flags: String,
    pub failure_flags: String,
    pub primary_flag: String,
    pub comparisons: Vec<BaselineComparison>,
}

impl SymbolFailureRow {
    pub fn to_table_row(&self) -> TableRow {
        let mut row = TableRow::new()
            .with("symbol", self.symbol.as_str())
            .with("n_pairs", self.n_pairs)
            .with("fail_rate", self.fail_rate)
            .with("failures", self.failures)
            .with("reason", self.reason.as_str())
            .with("flags", self.flags.as_str())
            .with("failure_flags", self.failure_flags.as_str())
            .with("primary_flag", self.primary_flag.as_str());
        for cmp in &self.comparisons {
            row.set(delta_final_column(&cmp.label), cmp.mean_delta_final);
            row.set(
                drawdown_improvement_column(&cmp.label),
                cmp.mean_drawdown_improvement,
            );
        }
        row
    }
}

// =============================================================================
// ACCUMULATION
// =============================================================================

#[derive(Debug, Default)]
struct DeltaSeries {
    delta_final: Vec<f64>,
    drawdown_improvement: Vec<f64>,
}

#[derive(Debug)]
struct SymbolAccumulator {
    symbol: String,
    n_pairs: usize,
    failures: usize,
    deltas: Vec<DeltaSeries>,
}

impl SymbolAccumulator {
    fn new(symbol: String, baselines: usize) -> Self {
        Self {
            symbol,
            n_pairs: 0,
            failures: 0,
            deltas: (0..baselines).map(|_| DeltaSeries::default()).collect(),
        }
    }

    fn observe(&mut self, record: &EpisodeRecord<'_>, baselines: &[BaselineIndex]) {
        let Some(stats) = record.equity().and_then(|eq| eq.stats()) else {
            return;
        };
        self.n_pairs += 1;
        if stats.is_failure() {
            self.failures += 1;
        }

        let Some(key) = record.identity_key() else {
            return;
        };
        for (index, series) in baselines.iter().zip(self.deltas.iter_mut()) {
            if let Some(base) = index.lookup(&key) {
                series.delta_final.push(stats.final_value - base.final_value);
                series
                    .drawdown_improvement
                    .push(base.max_drawdown - stats.max_drawdown);
            }
        }
    }

    fn finish(self, baselines: &[BaselineIndex]) -> Option<SymbolFailureRow> {
        if self.n_pairs == 0 {
            return None;
        }
        let comparisons = baselines
            .iter()
            .zip(self.deltas)
            .map(|(index, series)| BaselineComparison {
                label: index.label.clone(),
                matched: series.delta_final.len(),
                mean_delta_final: mean(&series.delta_final),
                mean_drawdown_improvement: mean(&series.drawdown_improvement),
            })
            .collect();

        Some(SymbolFailureRow {
            symbol: self.symbol,
            n_pairs: self.n_pairs,
            failures: self.failures,
            fail_rate: self.failures as f64 / self.n_pairs as f64,
            reason: String::new(),
            flags: String::new(),
            failure_flags: String::new(),
            primary_flag: String::new(),
            comparisons,
        })
    }
}

/// Symbol buckets of the treatment run, in first-seen order.
pub fn bucket_by_symbol(episodes: &[Value]) -> Vec<(String, Vec<EpisodeRecord<'_>>)> {
    let mut buckets: Vec<(String, Vec<EpisodeRecord<'_>>)> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();

    for raw in episodes {
        let record = EpisodeRecord::new(raw);
        let Some(symbol) = record.symbol() else {
            continue;
        };
        let idx = *slot.entry(symbol.clone()).or_insert_with(|| {
            buckets.push((symbol, Vec::new()));
            buckets.len() - 1
        });
        buckets[idx].1.push(record);
    }
    buckets
}

/// Per-symbol failure rows for the treatment run against each baseline.
///
/// Empty when no treatment episode carries a symbol.
pub fn build_symbol_failures(
    treatment: &[Value],
    baselines: &[BaselineIndex],
) -> Vec<SymbolFailureRow> {
    let buckets = bucket_by_symbol(treatment);
    if buckets.is_empty() {
        debug!("No symbol metadata in treatment episodes");
        return Vec::new();
    }

    buckets
        .into_iter()
        .filter_map(|(symbol, records)| {
            let mut acc = SymbolAccumulator::new(symbol, baselines.len());
            for record in &records {
                acc.observe(record, baselines);
            }
            if acc.n_pairs == 0 {
                debug!(symbol = %acc.symbol, "Symbol has no valid episodes");
            }
            acc.finish(baselines)
        })
        .collect()
}
