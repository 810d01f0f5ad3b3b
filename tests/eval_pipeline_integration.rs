//! Integration tests for the evaluation pipeline
//!
//! Each test lays out a throwaway run directory with `<policy>_curves.json`
//! artifacts and checks the CSV tables written by `run_eval`.

use std::fs;
use std::path::Path;

use earningsedge_eval::eval::{run_eval, EvalConfig, EvalError, PolicyRole, PolicySpec};
use serde_json::json;
use tempfile::TempDir;

const SUMMARY_HEADER: &str =
    "policy,n_episodes,mean_final_equity,median_final_equity,mean_max_drawdown,median_max_drawdown";

const SYMBOL_HEADER: &str = "symbol,n_pairs,fail_rate,failures,reason,flags,failure_flags,primary_flag,\
mean_delta_eq_vs_buyhold,mean_dd_improve_vs_buyhold,mean_delta_eq_vs_avoid,mean_dd_improve_vs_avoid";

fn write_artifact(dir: &Path, name: &str, value: serde_json::Value) {
    fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    rdr.records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn run_dir() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

#[test]
fn test_reference_scenario_end_to_end() {
    let dir = run_dir();
    write_artifact(
        dir.path(),
        "ppo_curves.json",
        json!({"episodes": [
            {"id": "a", "symbol": "ABC", "equity": [100, 120, 90]},
            {"id": "b", "symbol": "ABC", "equity": [100, 80, 70]},
        ]}),
    );
    write_artifact(
        dir.path(),
        "buy_hold_curves.json",
        json!([{"id": "a", "equity": [100, 110, 100]}]),
    );

    let report = run_eval(dir.path(), dir.path(), &EvalConfig::default()).unwrap();
    assert_eq!(report.loaded_policies, vec!["ppo", "buy_hold"]);

    let lines = read_lines(&dir.path().join("symbol_failure_summary.csv"));
    assert_eq!(lines[0], SYMBOL_HEADER);

    let rows = read_rows(&dir.path().join("symbol_failure_summary.csv"));
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row[0], "ABC");
    assert_eq!(row[1], "2");
    assert_eq!(row[2], "1.0");
    assert_eq!(row[3], "2");
    assert!(row[4..8].iter().all(String::is_empty));
    assert_eq!(row[8], "-10.0");
    // avoid_earnings artifact missing: absent, not zero
    assert_eq!(row[10], "");
    assert_eq!(row[11], "");
}

#[test]
fn test_summary_table_rows_in_priority_order() {
    let dir = run_dir();
    write_artifact(
        dir.path(),
        "flat_curves.json",
        json!({"data": [{"equity": [100, 100]}, {"equity": [100, 100]}]}),
    );
    write_artifact(
        dir.path(),
        "ppo_curves.json",
        json!([
            {"equity": [100, 50, 100]},
            {"equity_curve": [100, 120]},
            {"equity": [100]},
        ]),
    );
    write_artifact(
        dir.path(),
        "avoid_earnings_curves.json",
        json!({"episodes": [{"values": [5]}, {"note": "no curve"}]}),
    );

    run_eval(dir.path(), dir.path(), &EvalConfig::default()).unwrap();

    let lines = read_lines(&dir.path().join("summary_table.csv"));
    assert_eq!(lines[0], SUMMARY_HEADER);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "ppo,2,110.0,110.0,0.25,0.25");
    assert_eq!(lines[2], "flat,2,100.0,100.0,0.0,0.0");
}

#[test]
fn test_empty_run_writes_header_only_tables() {
    let dir = run_dir();
    let report = run_eval(dir.path(), dir.path(), &EvalConfig::default()).unwrap();

    assert!(report.loaded_policies.is_empty());
    assert_eq!(
        read_lines(&dir.path().join("summary_table.csv")),
        vec![SUMMARY_HEADER.to_string()]
    );
    assert_eq!(
        read_lines(&dir.path().join("symbol_failure_summary.csv")),
        vec![SYMBOL_HEADER.to_string()]
    );
}

#[test]
fn test_treatment_without_symbols_writes_header_only() {
    let dir = run_dir();
    write_artifact(
        dir.path(),
        "ppo_curves.json",
        json!([{"id": 1, "equity": [1, 2]}]),
    );

    let report = run_eval(dir.path(), dir.path(), &EvalConfig::default()).unwrap();
    assert!(report.symbol_failures.is_empty());
    assert_eq!(report.summary.len(), 1);
    assert_eq!(
        read_lines(&dir.path().join("symbol_failure_summary.csv")),
        vec![SYMBOL_HEADER.to_string()]
    );
}

#[test]
fn test_out_dir_is_created_on_demand() {
    let dir = run_dir();
    write_artifact(dir.path(), "ppo_curves.json", json!([{"equity": [1, 2]}]));
    let out = dir.path().join("artifacts").join("sprint5");

    let report = run_eval(dir.path(), &out, &EvalConfig::default()).unwrap();
    assert!(out.join("summary_table.csv").exists());
    assert!(out.join("symbol_failure_summary.csv").exists());
    assert_eq!(report.summary_path, out.join("summary_table.csv"));
}

#[test]
fn test_missing_run_dir_is_fatal() {
    let dir = run_dir();
    let missing = dir.path().join("does_not_exist");
    let err = run_eval(&missing, &missing, &EvalConfig::default()).unwrap_err();
    assert!(matches!(err, EvalError::RunDirNotFound(_)));
    assert!(err.to_string().contains("does_not_exist"));
}

#[test]
fn test_custom_config_labels_and_artifacts() {
    let dir = run_dir();
    write_artifact(
        dir.path(),
        "rl.json",
        json!([
            {"episode_id": "e1", "ticker": "xyz", "curve": {"equity": [1.0, 1.2, 1.1]}},
            {"episode_id": "e2", "ticker": " XYZ", "curve": {"equity": [1.0, 0.9]}},
        ]),
    );
    write_artifact(
        dir.path(),
        "hold.json",
        json!({"episodes": [
            {"episodeId": "e1", "equity": [1.0, 1.0]},
            {"episodeId": "e2", "equity": [1.0, 0.8]},
        ]}),
    );

    let config = EvalConfig {
        policies: vec![
            PolicySpec::new("rl", PolicyRole::Treatment).with_artifact("rl.json"),
            PolicySpec::new("hold", PolicyRole::Baseline).with_artifact("hold.json"),
        ],
        ..EvalConfig::default()
    };

    let report = run_eval(dir.path(), dir.path(), &config).unwrap();
    assert_eq!(report.symbol_failures.len(), 1);
    let row = &report.symbol_failures[0];
    assert_eq!(row.symbol, "XYZ");
    assert_eq!(row.n_pairs, 2);
    // e1: 1.1 < 0.95 * 1.2; e2: 0.9 < 0.95 * 1.0
    assert_eq!(row.failures, 2);
    let cmp = &row.comparisons[0];
    assert_eq!(cmp.label, "hold");
    assert_eq!(cmp.matched, 2);
    assert!((cmp.mean_delta_final - 0.1).abs() < 1e-9);

    let lines = read_lines(&dir.path().join("symbol_failure_summary.csv"));
    assert!(lines[0].ends_with("mean_delta_eq_vs_hold,mean_dd_improve_vs_hold"));
}

#[test]
fn test_invalid_artifact_json_is_fatal() {
    let dir = run_dir();
    fs::write(dir.path().join("buy_hold_curves.json"), "[{").unwrap();
    let err = run_eval(dir.path(), dir.path(), &EvalConfig::default()).unwrap_err();
    assert!(matches!(err, EvalError::Json { .. }));
}

#[test]
fn test_non_finite_tokens_are_sanitized_not_fatal() {
    let dir = run_dir();
    fs::write(
        dir.path().join("ppo_curves.json"),
        r#"[{"id": "a", "symbol": "ABC", "equity": [100, NaN, 90]},
            {"id": "b", "symbol": "ABC", "equity": [100, 120, Infinity]}]"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("buy_hold_curves.json"),
        r#"{"episodes": [{"id": "a", "equity": [100, 1e400, 95]}]}"#,
    )
    .unwrap();

    let report = run_eval(dir.path(), dir.path(), &EvalConfig::default()).unwrap();
    assert!(dir.path().join("summary_table.csv").exists());
    assert!(dir.path().join("symbol_failure_summary.csv").exists());

    let ppo = &report.summary[0];
    assert_eq!(ppo.policy, "ppo");
    assert_eq!(ppo.n_episodes, 2);
    // Episode b ends on a non-finite point: counted, but its final is absent
    assert!((ppo.mean_final_equity - 90.0).abs() < 1e-9);
    assert!((ppo.mean_max_drawdown - 0.05).abs() < 1e-9);

    let row = &report.symbol_failures[0];
    assert_eq!(row.n_pairs, 2);
    assert_eq!(row.failures, 1);
    let cmp = &row.comparisons[0];
    assert_eq!(cmp.matched, 1);
    assert!((cmp.mean_delta_final + 5.0).abs() < 1e-9);
}
