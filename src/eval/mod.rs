//! Episode Curve Evaluation
//!
//! Aggregates per-episode equity curves produced by several trading policies
//! over a shared episode universe into the tables the dashboard reads.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  <policy>_curves.json  (one per policy, any supported shape) │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                     ┌──────────────────┐
//!                     │  RunArtifacts    │  artifacts.rs
//!                     └────────┬─────────┘
//!                              ▼
//!                     ┌──────────────────┐
//!                     │  normalize       │  collection + record aliases
//!                     └────────┬─────────┘
//!                              ▼
//!                     ┌──────────────────┐
//!                     │  equity_stats    │  final, peak, max drawdown
//!                     └────────┬─────────┘
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!     ┌─────────────────┐            ┌───────────────────┐
//!     │  summary        │            │  symbol_failure   │
//!     │  (per policy)   │            │  (per symbol,     │
//!     └────────┬────────┘            │   keyed joins)    │
//!              │                     └─────────┬─────────┘
//!              └───────────────┬───────────────┘
//!                              ▼
//!                     ┌──────────────────┐
//!                     │  table (CSV)     │
//!                     └──────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - Curves shorter than two points never contribute to any count.
//! - Absent values are NaN (empty CSV cells), never zero.
//! - Both tables are always written; empty results give header-only files.
//! - Everything is recomputed from the artifacts on each run.

pub mod artifacts;
pub mod config;
pub mod equity_stats;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod summary;
pub mod symbol_failure;
pub mod table;

pub use artifacts::{load_json, null_non_finite_tokens, PolicyArtifact, RunArtifacts};
pub use config::{EvalConfig, PolicyRole, PolicySpec};
pub use equity_stats::{
    max_drawdown, mean, median, EpisodeStats, EquitySeries, FAILURE_PEAK_FRACTION,
    MIN_EQUITY_POINTS,
};
pub use error::{EvalError, EvalResult};
pub use normalize::{episodes, CollectionShape, EpisodeRecord};
pub use pipeline::{run_eval, symbol_failures_for_run, EvalReport};
pub use summary::{build_summary_table, summarize_policy, SummaryRow, SUMMARY_COLUMNS};
pub use symbol_failure::{
    build_symbol_failures, symbol_failure_columns, BaselineComparison, BaselineIndex,
    SymbolFailureRow,
};
pub use table::{render_table, write_table, Cell, TableRow};
