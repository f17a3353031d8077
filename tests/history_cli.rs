//! Integration tests for `vibe-auditor history`.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn auditor_bin(project: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vibe-auditor"));
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .args(["--project", project.to_str().unwrap()]);
    cmd
}

fn run(project: &Path, args: &[&str]) -> Output {
    let out = auditor_bin(project).args(args).output().expect("run vibe-auditor");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    out
}

fn run_json(project: &Path, args: &[&str]) -> Value {
    let mut full = args.to_vec();
    full.extend(["--format", "json"]);
    serde_json::from_slice(&run(project, &full).stdout).expect("json output")
}

fn record(project: &Path, warning: &str) {
    run(
        project,
        &["history", "record", "--mode", "deployment", "--warning", warning],
    );
}

#[test]
fn trend_reflects_last_two_runs() {
    let tmp = tempfile::tempdir().unwrap();
    record(tmp.path(), "10");
    record(tmp.path(), "5");

    let trend = run_json(tmp.path(), &["history", "trend"]);
    assert_eq!(trend["trend"], "improving");
    assert_eq!(trend["totalRuns"], 2);
    assert_eq!(trend["change"], -5);
    assert_eq!(trend["changePercent"], -50.0);
    assert_eq!(trend["timeline"][0]["totalIssues"], 10);
}

#[test]
fn empty_trend_is_no_data() {
    let tmp = tempfile::tempdir().unwrap();
    let trend = run_json(tmp.path(), &["history", "trend"]);
    assert_eq!(trend["trend"], "no_data");
    assert_eq!(trend["totalRuns"], 0);
}

#[test]
fn record_with_ai_counts_combines_severities() {
    let tmp = tempfile::tempdir().unwrap();
    run(
        tmp.path(),
        &[
            "history", "record", "--mode", "personal", "--critical", "1", "--info", "2",
            "--ai-critical", "3",
        ],
    );

    let history = run_json(tmp.path(), &["history", "show"]);
    let summary = &history[0]["summary"];
    assert_eq!(summary["totalIssues"], 6);
    assert_eq!(summary["staticIssues"], 3);
    assert_eq!(summary["aiIssues"], 3);
    assert_eq!(summary["bySeverity"]["critical"], 4);
}

#[test]
fn show_limit_returns_newest() {
    let tmp = tempfile::tempdir().unwrap();
    record(tmp.path(), "1");
    record(tmp.path(), "2");
    record(tmp.path(), "3");

    let history = run_json(tmp.path(), &["history", "show", "--limit", "1"]);
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["summary"]["totalIssues"], 3);
}

#[test]
fn export_json_and_csv() {
    let tmp = tempfile::tempdir().unwrap();
    record(tmp.path(), "4");

    let json_out = tmp.path().join("history-export.json");
    run(tmp.path(), &["history", "export", json_out.to_str().unwrap()]);
    let exported: Value = serde_json::from_str(&fs::read_to_string(&json_out).unwrap()).unwrap();
    assert_eq!(exported["totalRuns"], 1);

    let csv_out = tmp.path().join("timeline.csv");
    run(
        tmp.path(),
        &["history", "export", csv_out.to_str().unwrap(), "--csv"],
    );
    let csv = fs::read_to_string(&csv_out).unwrap();
    assert!(csv.starts_with("timestamp,total_issues,critical,warning,info\n"));
    assert!(csv.lines().nth(1).unwrap().ends_with(",4,0,4,0"));
}

#[test]
fn clear_empties_history() {
    let tmp = tempfile::tempdir().unwrap();
    record(tmp.path(), "2");
    run(tmp.path(), &["history", "clear"]);
    let history = run_json(tmp.path(), &["history", "show"]);
    assert!(history.as_array().unwrap().is_empty());
}

#[test]
fn disabled_history_records_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join(".vibe-auditor.toml"),
        "[history]\nenabled = false\n",
    )
    .unwrap();
    record(tmp.path(), "2");
    assert!(!tmp.path().join(".vibe-auditor-history").exists());
}
