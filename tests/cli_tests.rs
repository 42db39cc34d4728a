//! CLI integration tests.
//!
//! None of these reach a container daemon: every scenario either finds no
//! recorded cluster or fails configuration before the runtime is resolved.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

fn minicluster(dir: &tempfile::TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("minicluster");
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env("HOME", dir.path())
        .arg("--color")
        .arg("never")
        .arg("--state-dir")
        .arg(dir.path().join("state"));
    cmd
}

#[test]
fn help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    minicluster(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("info"));
}

#[test]
fn version_names_the_binary() {
    let dir = tempfile::tempdir().unwrap();
    minicluster(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("minicluster"));
}

#[test]
fn info_without_cluster_reports_not_running() {
    let dir = tempfile::tempdir().unwrap();
    minicluster(&dir)
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cluster is not running"));
}

#[test]
fn destroy_without_cluster_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    minicluster(&dir)
        .arg("destroy")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cluster is not running"));
}

#[test]
fn info_json_reports_status() {
    let dir = tempfile::tempdir().unwrap();
    let output = minicluster(&dir)
        .args(["info", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["command"], "info");
    assert_eq!(json["status"], "not_running");
}

#[test]
fn destroy_json_reports_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let output = minicluster(&dir)
        .args(["destroy", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"]["status"], "not_running");
}

#[test]
fn up_with_mismatched_resources_fails_before_docker() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("cluster.toml");
    fs::write(
        &config,
        "[cluster]\nworkers = 2\nworker_resources = [\"cpus(*):1\"]\n",
    )
    .unwrap();

    minicluster(&dir)
        .arg("up")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("worker_resources"));

    assert!(!dir.path().join("state").join("cluster.json").exists());
}

#[test]
fn up_with_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    minicluster(&dir)
        .args(["up", "--config", "does-not-exist.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does-not-exist.toml"));
}

#[test]
fn up_with_malformed_config_points_at_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("broken.toml");
    fs::write(&config, "[cluster\nworkers = 2\n").unwrap();

    minicluster(&dir)
        .arg("up")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("broken.toml"));
}

#[test]
fn up_reports_already_running_cluster() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state");
    fs::create_dir_all(&state).unwrap();
    fs::write(
        state.join("cluster.json"),
        r#"{"version":"1","cluster_id":"feedbeef","created_at":"2026-01-01T00:00:00Z","members":[]}"#,
    )
    .unwrap();

    minicluster(&dir)
        .arg("up")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cluster feedbeef is already running"));
}

#[test]
fn zero_workers_flag_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    minicluster(&dir)
        .args(["up", "--workers", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("workers"));
}
