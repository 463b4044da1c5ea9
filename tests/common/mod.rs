//! Common test utilities for Tab Trail integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's platform data directory.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// The `tt()` method returns a `Command` that sets `TT_DATA_DIR` per
/// invocation, making tests parallel-safe.
pub struct TestEnv {
    pub root: TempDir,
}

impl TestEnv {
    /// Create a new test environment. The data directory does not exist yet.
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and run `tt init`.
    pub fn init() -> Self {
        let env = Self::new();
        env.tt().arg("init").assert().success();
        env
    }

    /// Get a Command for the tt binary with an isolated data directory.
    pub fn tt(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tt"));
        cmd.current_dir(self.root.path());
        cmd.env("TT_DATA_DIR", self.data_path());
        cmd.env_remove("TT_LOG_FORMAT");
        cmd
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> PathBuf {
        self.root.path().join("data")
    }

    /// Write a JSONL session file into the temp root and return its path.
    pub fn write_session(&self, name: &str, lines: &[&str]) -> PathBuf {
        let path = self.root.path().join(name);
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    /// Run `tt ingest <file>` and return the parsed JSON lines it printed.
    pub fn ingest(&self, path: &Path) -> Vec<Value> {
        let output = self
            .tt()
            .arg("ingest")
            .arg(path)
            .output()
            .expect("Failed to run tt ingest");
        assert!(
            output.status.success(),
            "tt ingest failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        parse_json_lines(&output.stdout)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse JSON output from a command.
pub fn parse_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("Failed to parse JSON output")
}

/// Parse one JSON value per non-empty output line.
pub fn parse_json_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("Failed to parse JSON line"))
        .collect()
}
