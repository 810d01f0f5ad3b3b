//! EarningsEdge Evaluation Library
//!
//! Turns per-policy episode curve artifacts into the summary tables consumed
//! by the dashboard. Used by the `build_eval_csvs` binary and the tests.

pub mod eval;
