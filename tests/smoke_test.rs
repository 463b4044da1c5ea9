//! Smoke tests for the Tab Trail CLI.
//!
//! These tests verify basic CLI functionality:
//! - `tt --version` outputs version info
//! - `tt --help` outputs help text
//! - unknown commands and uninitialized stores fail cleanly

mod common;

use assert_cmd::Command;
use common::TestEnv;
use predicates::prelude::*;

/// Get a Command for the tt binary.
fn tt() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tt"))
}

#[test]
fn test_version_flag() {
    tt().arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tt"))
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    tt().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("ingest"))
        .stdout(predicate::str::contains("trail"));
}

#[test]
fn test_settings_help() {
    tt().args(["settings", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("set"));
}

#[test]
fn test_invalid_command() {
    tt().arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_uninitialized_store_is_json_error() {
    let env = TestEnv::new();
    env.tt()
        .arg("tabs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("tt init"));
}

#[test]
fn test_uninitialized_store_human_error() {
    let env = TestEnv::new();
    env.tt()
        .args(["stats", "-H"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Not initialized"));
}

#[test]
fn test_init_creates_store_and_config() {
    let env = TestEnv::new();
    env.tt()
        .args(["init", "--retention-days", "14"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"config_written\":true"))
        .stdout(predicate::str::contains("\"retentionDays\":14"));

    assert!(env.data_path().join("config.kdl").exists());
    assert!(env.data_path().join("store.json").exists());

    // Second init keeps the existing config and settings.
    env.tt()
        .args(["init", "--retention-days", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"config_written\":false"))
        .stdout(predicate::str::contains("\"retentionDays\":14"));
}

#[test]
fn test_init_human_output() {
    let env = TestEnv::new();
    env.tt()
        .args(["init", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized Tab Trail"))
        .stdout(predicate::str::contains("retention 7 days"));
}
