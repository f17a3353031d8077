//! Integration tests for `vibe-auditor rank` and `vibe-auditor config`.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;

fn auditor_bin(project: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vibe-auditor"));
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .args(["--project", project.to_str().unwrap()]);
    cmd
}

fn touch(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn rank_json(project: &Path, extra: &[&str]) -> Value {
    let out = auditor_bin(project)
        .arg("rank")
        .args(extra)
        .args(["--format", "json"])
        .output()
        .expect("run vibe-auditor rank");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("json output")
}

#[test]
fn server_outranks_deep_utility() {
    let tmp = tempfile::tempdir().unwrap();
    touch(tmp.path(), "src/server.py", "def serve():\n    pass\n");
    touch(tmp.path(), "src/deep/nested/folder/util.py", "def helper():\n    pass\n");

    let rounds = rank_json(tmp.path(), &["--max-files", "1"]);
    assert_eq!(rounds[0][0]["path"], "src/server.py");
    assert_eq!(rounds[0][0]["breakdown"]["role"], 100.0);
}

#[test]
fn rounds_never_repeat_a_file() {
    let tmp = tempfile::tempdir().unwrap();
    for name in ["app.py", "models.py", "helper_util.py"] {
        touch(tmp.path(), name, "def f():\n    pass\n");
    }

    let rounds = rank_json(tmp.path(), &["--max-files", "2", "--rounds", "5"]);
    let rounds = rounds.as_array().unwrap();
    assert_eq!(rounds.len(), 2);
    let mut seen: Vec<String> = rounds
        .iter()
        .flat_map(|r| r.as_array().unwrap().iter())
        .map(|f| f["path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(seen.len(), 3);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 3);
    assert_eq!(rounds[0][0]["path"], "app.py");
}

#[test]
fn empty_project_ranks_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    touch(tmp.path(), "README.md", "# nothing to rank\n");
    let rounds = rank_json(tmp.path(), &[]);
    assert!(rounds.as_array().unwrap().is_empty());
}

#[test]
fn config_init_then_show() {
    let tmp = tempfile::tempdir().unwrap();

    let out = auditor_bin(tmp.path())
        .args(["config", "init"])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(tmp.path().join(".vibe-auditor.toml").exists());

    let out = auditor_bin(tmp.path())
        .args(["config", "init"])
        .output()
        .unwrap();
    assert!(!out.status.success(), "init must not overwrite");

    let out = auditor_bin(tmp.path())
        .args(["config", "show"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("ttl_hours = 24"));
    assert!(stdout.contains("[ranker]"));
}

#[test]
fn missing_project_dir_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let out = auditor_bin(&tmp.path().join("does-not-exist"))
        .args(["cache", "stats"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Project directory not found"));
}
