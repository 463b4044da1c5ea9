//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The [`TrailConfig`] struct representing the KDL schema
//! - Conversion to and from KDL documents
//! - Validation
//! - Reading and writing the file in a data directory

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;
use crate::storage::BackendType;

/// File name of the host config inside the data directory.
pub const CONFIG_FILE: &str = "config.kdl";

/// Host preferences stored in config.kdl.
///
/// The settings fields only seed the stored settings on first start; after
/// that the extension pages own them.
///
/// # KDL Schema
///
/// ```kdl
/// backend "sqlite"        // or "file", "memory"
/// tracking-enabled #true
/// retention-days 14
/// max-pages-per-tab 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrailConfig {
    /// Storage backend for the data directory
    pub backend: Option<BackendType>,

    /// Initial `trackingEnabled`
    pub tracking_enabled: Option<bool>,

    /// Initial `retentionDays`
    pub retention_days: Option<u32>,

    /// Initial `maxPagesPerTab`
    pub max_pages_per_tab: Option<usize>,
}

impl TrailConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.retention_days == Some(0) {
            return Err("retention-days must be at least 1".to_string());
        }
        if self.max_pages_per_tab == Some(0) {
            return Err("max-pages-per-tab must be at least 1".to_string());
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown nodes and ill-typed values are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(value) = first_value(doc, "backend") {
            config.backend = value.as_string().and_then(BackendType::parse);
        }

        if let Some(value) = first_value(doc, "tracking-enabled") {
            config.tracking_enabled = value.as_bool();
        }

        if let Some(value) = first_value(doc, "retention-days") {
            config.retention_days = value.as_integer().and_then(|i| u32::try_from(i).ok());
        }

        if let Some(value) = first_value(doc, "max-pages-per-tab") {
            config.max_pages_per_tab = value.as_integer().and_then(|i| usize::try_from(i).ok());
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(backend) = self.backend {
            push_node(
                &mut doc,
                "backend",
                KdlValue::String(backend.as_str().to_string()),
            );
        }

        if let Some(enabled) = self.tracking_enabled {
            push_node(&mut doc, "tracking-enabled", KdlValue::Bool(enabled));
        }

        if let Some(days) = self.retention_days {
            push_node(&mut doc, "retention-days", KdlValue::Integer(i128::from(days)));
        }

        if let Some(pages) = self.max_pages_per_tab {
            push_node(
                &mut doc,
                "max-pages-per-tab",
                KdlValue::Integer(pages as i128),
            );
        }

        doc
    }
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

/// Path of config.kdl inside `data_dir`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Read config.kdl from `data_dir`. A missing file is an empty config.
pub fn read_config(data_dir: &Path) -> Result<TrailConfig> {
    let path = config_path(data_dir);
    if !path.exists() {
        return Ok(TrailConfig::new());
    }
    let content = fs::read_to_string(&path)?;
    let doc: KdlDocument = content.parse()?;
    Ok(TrailConfig::from_kdl(&doc))
}

/// Write config.kdl into `data_dir`, replacing any existing file.
pub fn write_config(data_dir: &Path, config: &TrailConfig) -> Result<()> {
    fs::create_dir_all(data_dir)?;
    fs::write(config_path(data_dir), config.to_kdl().to_string())?;
    Ok(())
}
