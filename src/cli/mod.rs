//! CLI argument definitions for Tab Trail.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::storage::BackendType;

/// Tab Trail - tab provenance tracking and trail reconstruction.
///
/// Replay browser events with `tt ingest`, then inspect the result with
/// `tt tabs` and `tt trail <TAB_ID>`.
#[derive(Parser, Debug)]
#[command(name = "tt")]
#[command(author, version, about = "Track how browser tabs open each other and reconstruct their trails", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Directory holding the store and config.kdl.
    /// Can also be set via TT_DATA_DIR environment variable.
    #[arg(long, global = true, env = "TT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Storage backend (overrides config.kdl)
    #[arg(long, global = true, value_parser = parse_backend)]
    pub backend: Option<BackendType>,

    /// Log line format on stderr
    #[arg(long, global = true, env = "TT_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Format of diagnostic log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

fn parse_backend(s: &str) -> Result<BackendType, String> {
    s.parse()
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory, config.kdl, and default settings
    Init {
        /// Seed `trackingEnabled`
        #[arg(long)]
        tracking_enabled: Option<bool>,

        /// Seed `retentionDays`
        #[arg(long)]
        retention_days: Option<u32>,

        /// Seed `maxPagesPerTab`
        #[arg(long)]
        max_pages_per_tab: Option<usize>,
    },

    /// Replay a JSONL stream of browser events and requests
    ///
    /// Each line is either a browser event (`{"event": "tab_created", ...}`)
    /// or a request (`{"action": "getCurrentTrail"}`). One response is
    /// printed per request.
    Ingest {
        /// Input file (reads stdin when omitted or '-')
        file: Option<PathBuf>,

        /// Stop at the first event that fails instead of logging and continuing
        #[arg(long)]
        fail_fast: bool,
    },

    /// List tracked tabs
    Tabs {
        /// Include closed tabs
        #[arg(short, long)]
        all: bool,
    },

    /// Show the trail that led to a tab
    Trail {
        /// Tab ID (e.g., 42)
        tab_id: String,
    },

    /// Show storage statistics
    Stats,

    /// Delete old records that are not part of any relationship
    Evict {
        /// Retention window in days (defaults to the stored `retentionDays`)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Wipe every record and the settings
    Clear {
        /// Confirm the wipe
        #[arg(long)]
        force: bool,
    },

    /// Settings management commands
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Host configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Settings subcommands
#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show the stored settings
    Show,

    /// Change one setting
    Set {
        /// Setting key (trackingEnabled, retentionDays, maxPagesPerTab)
        key: String,
        /// New value
        value: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved configuration and where each value came from
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // This will panic if the CLI is misconfigured
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "tt",
            "trail",
            "42",
            "-H",
            "--backend",
            "sqlite",
            "--data-dir",
            "/tmp/tt",
        ])
        .unwrap();

        assert!(cli.human_readable);
        assert_eq!(cli.backend, Some(BackendType::Sqlite));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/tt")));
        match cli.command {
            Commands::Trail { tab_id } => assert_eq!(tab_id, "42"),
            other => panic!("Expected Trail, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_unknown_backend() {
        assert!(Cli::try_parse_from(["tt", "stats", "--backend", "floppy"]).is_err());
    }
}
