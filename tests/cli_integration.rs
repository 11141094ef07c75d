//! CLI integration tests
//!
//! Tests the registry-pruner binary end-to-end for commands that need no network

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn pruner() -> Command {
    Command::cargo_bin("registry-pruner").unwrap()
}

/// Empty config file so the user's own config never leaks into a test
fn empty_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "").unwrap();
    path
}

fn write_chain(root: &Path, chain: &str, content: &str) {
    let folder = root.join(chain);
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join("chain.json"), content).unwrap();
}

// ==================== Basic CLI tests ====================

#[test]
fn test_version() {
    pruner()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("registry-pruner"));
}

#[test]
fn test_help() {
    pruner()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Prune stale RPC/REST endpoints"))
        .stdout(predicate::str::contains("prune"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_prune_help() {
    pruner()
        .args(["prune", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--freshness-days"))
        .stdout(predicate::str::contains("--deadline-secs"));
}

#[test]
fn test_check_help() {
    pruner()
        .args(["check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--provider"));
}

#[test]
fn test_no_subcommand_fails() {
    pruner().assert().failure();
}

// ==================== Prune tests ====================

#[test]
fn test_prune_missing_root_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(&dir);

    pruner()
        .arg("--config")
        .arg(&config)
        .args(["prune", "-q", "--root"])
        .arg(dir.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_prune_rejects_bad_status_url() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(&dir);

    pruner()
        .arg("--config")
        .arg(&config)
        .args(["prune", "-q", "--status-url", "status.example", "--root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("status_url"));
}

#[test]
fn test_prune_registry_without_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(&dir);
    let root = dir.path().join("registry");
    std::fs::create_dir_all(&root).unwrap();

    let record = "{\n  \"chain_name\": \"demo\",\n  \"apis\": {\n    \"rpc\": [],\n    \"rest\": []\n  }\n}\n";
    write_chain(&root, "demo", record);
    write_chain(&root, "_template", record);

    pruner()
        .arg("--config")
        .arg(&config)
        .args(["prune", "-q", "--root"])
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 chains, 0 endpoints"))
        .stdout(predicate::str::contains("0 removed"));

    let after = std::fs::read_to_string(root.join("demo").join("chain.json")).unwrap();
    assert_eq!(after, record);
}

#[test]
fn test_prune_dry_run_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(&dir);

    pruner()
        .arg("--config")
        .arg(&config)
        .args(["prune", "-q", "--dry-run", "--json", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dry_run\": true"))
        .stdout(predicate::str::contains("\"removed\": {}"));
}

// ==================== Check tests ====================

#[test]
fn test_check_empty_registry_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(&dir);
    let root = dir.path().join("registry");
    std::fs::create_dir_all(&root).unwrap();
    let output = dir.path().join("health.json");

    pruner()
        .arg("--config")
        .arg(&config)
        .args(["check", "-q", "--root"])
        .arg(&root)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(report["summary"]["total_endpoints"], 0);
    assert!(report["details"].as_array().unwrap().is_empty());
}

// ==================== Config tests ====================

#[test]
fn test_config_path() {
    pruner()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_path_honors_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");

    pruner()
        .arg("--config")
        .arg(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_init_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    pruner()
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No config file found"));

    pruner()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success();

    pruner()
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("freshness_days = 10"));

    pruner()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}
