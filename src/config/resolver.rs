//! Precedence resolution for host configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (or their environment variables)
//! 2. config.kdl in the data directory
//! 3. Built-in defaults
//!
//! The data directory itself comes from `--data-dir` / `TT_DATA_DIR`, falling
//! back to the platform data directory.

use std::path::{Path, PathBuf};

use crate::config::schema::{self, TrailConfig};
use crate::models::Settings;
use crate::storage::BackendType;
use crate::{Error, Result};

/// Directory name under the platform data directory.
pub const DATA_DIR_NAME: &str = "tabtrail";

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "TT_DATA_DIR";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from config.kdl
    ConfigFile,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }

    fn pick(flag: Option<T>, file: Option<T>, default: T) -> Self {
        match (flag, file) {
            (Some(value), _) => Self::new(value, ValueSource::CliFlag),
            (None, Some(value)) => Self::new(value, ValueSource::ConfigFile),
            (None, None) => Self::new(default, ValueSource::Default),
        }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_dir: Resolved<PathBuf>,
    pub backend: Resolved<BackendType>,
    pub tracking_enabled: Resolved<bool>,
    pub retention_days: Resolved<u32>,
    pub max_pages_per_tab: Resolved<usize>,
}

impl ResolvedConfig {
    pub fn data_dir(&self) -> &Path {
        &self.data_dir.value
    }

    pub fn backend(&self) -> BackendType {
        self.backend.value
    }

    /// Settings to seed into an empty store.
    pub fn seed_settings(&self) -> Settings {
        Settings {
            tracking_enabled: self.tracking_enabled.value,
            retention_days: self.retention_days.value,
            max_pages_per_tab: self.max_pages_per_tab.value,
        }
    }

    /// Path of config.kdl for this data directory.
    pub fn config_path(&self) -> PathBuf {
        schema::config_path(self.data_dir())
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub backend: Option<BackendType>,
    pub tracking_enabled: Option<bool>,
    pub retention_days: Option<u32>,
    pub max_pages_per_tab: Option<usize>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_tracking_enabled(mut self, enabled: bool) -> Self {
        self.tracking_enabled = Some(enabled);
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = Some(days);
        self
    }

    pub fn with_max_pages_per_tab(mut self, pages: usize) -> Self {
        self.max_pages_per_tab = Some(pages);
        self
    }
}

/// Resolve the data directory: CLI flag, else `<platform data dir>/tabtrail`.
pub fn resolve_data_dir(flag: Option<&Path>) -> Result<Resolved<PathBuf>> {
    if let Some(dir) = flag {
        return Ok(Resolved::new(dir.to_path_buf(), ValueSource::CliFlag));
    }
    dirs::data_dir()
        .map(|dir| Resolved::new(dir.join(DATA_DIR_NAME), ValueSource::Default))
        .ok_or_else(|| {
            Error::Other(format!(
                "Could not determine a data directory; set {} or pass --data-dir",
                DATA_DIR_ENV
            ))
        })
}

/// Resolve configuration with the full precedence chain.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let data_dir = resolve_data_dir(overrides.data_dir.as_deref())?;
    let file = schema::read_config(&data_dir.value)?;
    file.validate().map_err(Error::InvalidInput)?;
    Ok(resolve_with(data_dir, &file, overrides))
}

/// Resolve against an already loaded config.kdl.
pub fn resolve_with(
    data_dir: Resolved<PathBuf>,
    file: &TrailConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let defaults = Settings::default();
    ResolvedConfig {
        data_dir,
        backend: Resolved::pick(overrides.backend, file.backend, BackendType::default()),
        tracking_enabled: Resolved::pick(
            overrides.tracking_enabled,
            file.tracking_enabled,
            defaults.tracking_enabled,
        ),
        retention_days: Resolved::pick(
            overrides.retention_days,
            file.retention_days,
            defaults.retention_days,
        ),
        max_pages_per_tab: Resolved::pick(
            overrides.max_pages_per_tab,
            file.max_pages_per_tab,
            defaults.max_pages_per_tab,
        ),
    }
}
