//! Storage layer for Tab Trail data.
//!
//! This module handles persistence of tab records and settings, keeps the
//! parent/child back-references consistent, applies the retention policy, and
//! answers trail queries.
//!
//! ## Layout
//!
//! Every backend holds two namespaces:
//! - `tabs`: one map of tab id → [`TabRecord`]
//! - `settings`: one [`Settings`] object
//!
//! Each operation is a full read-modify-write of the namespace it touches.
//!
//! ## Storage Backends
//!
//! - **File backend** (default): `<data-dir>/store.json`
//! - **SQLite backend**: `<data-dir>/store.db`
//! - **Memory backend**: nothing on disk

pub mod backend;
pub mod file;
pub mod memory;
pub mod sqlite;
pub mod trail;

pub use backend::{BackendType, StorageBackend};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::clock::{Clock, SystemClock};
use crate::models::{Settings, TabRecord, TabStatus, TrailStep};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Namespace holding the map of tab records.
pub const TABS_KEY: &str = "tabs";
/// Namespace holding the settings object.
pub const SETTINGS_KEY: &str = "settings";

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Outcome of a retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    /// Records deleted
    pub removed: usize,
    /// Records older than the cutoff kept because they are part of a relationship
    pub preserved_for_relationships: usize,
    /// Records left in the store
    pub remaining: usize,
    /// Cutoff timestamp (epoch ms)
    pub cutoff: i64,
}

/// Size and shape of the stored data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub tab_count: usize,
    pub active_tabs: usize,
    pub closed_tabs: usize,
    /// Tabs without a parent
    pub root_tabs: usize,
    /// Current pages plus history entries
    pub total_pages: usize,
    /// Serialized size of both namespaces
    pub size_bytes: usize,
}

/// Storage manager for one browser profile.
pub struct Storage {
    backend: Box<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
}

impl Storage {
    /// Wrap a backend with a clock used for record timestamps.
    pub fn new(backend: Box<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Open existing storage in `data_dir`.
    pub fn open(data_dir: &Path, backend_type: BackendType) -> Result<Self> {
        if backend_type.is_persistent() && !data_dir.exists() {
            return Err(Error::NotInitialized);
        }
        Ok(Self::new(
            open_backend(data_dir, backend_type)?,
            Arc::new(SystemClock),
        ))
    }

    /// Create the data directory (if needed) and open storage in it.
    pub fn init(data_dir: &Path, backend_type: BackendType) -> Result<Self> {
        if backend_type.is_persistent() {
            fs::create_dir_all(data_dir)?;
        }
        Ok(Self::new(
            open_backend(data_dir, backend_type)?,
            Arc::new(SystemClock),
        ))
    }

    /// Check if storage exists in `data_dir`.
    pub fn exists(data_dir: &Path, backend_type: BackendType) -> bool {
        match backend_type {
            BackendType::Memory => false,
            BackendType::File => data_dir.join(file::STORE_FILE).exists(),
            BackendType::Sqlite => data_dir.join(sqlite::STORE_DB).exists(),
        }
    }

    /// Current time from the storage clock (epoch ms).
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Seed settings on first start. Returns the settings now in effect.
    pub fn initialize(&mut self, defaults: &Settings) -> Result<Settings> {
        if self.backend.read(SETTINGS_KEY)?.is_none() {
            info!("Storage: seeding default settings");
            self.save_settings(defaults)?;
        }
        self.get_settings()
    }

    // === Tab Operations ===

    /// Get all tab records keyed by id.
    pub fn get_tabs(&self) -> Result<BTreeMap<String, TabRecord>> {
        match self.backend.read(TABS_KEY)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Get a tab record by id.
    pub fn get_tab(&self, id: &str) -> Result<Option<TabRecord>> {
        let id = canonical_id(id);
        Ok(self.get_tabs()?.remove(&id))
    }

    fn write_tabs(&mut self, tabs: &BTreeMap<String, TabRecord>) -> Result<()> {
        let value = serde_json::to_value(tabs)?;
        self.backend.write(TABS_KEY, &value)
    }

    /// Insert or replace a tab record.
    ///
    /// The id is coerced to canonical form and `lastUpdated` is re-stamped.
    pub fn save_tab(&mut self, id: &str, mut record: TabRecord) -> Result<TabRecord> {
        let id = canonical_id(id);
        record.id = id.clone();
        record.last_updated = self.now_ms();

        debug!(
            "Storage: saving tab {} with parentId {:?}",
            id, record.parent_id
        );

        let mut tabs = self.get_tabs()?;
        tabs.insert(id, record.clone());
        self.write_tabs(&tabs)?;
        Ok(record)
    }

    /// Point `child_id` at `parent_id` and keep the `children` sets in step.
    ///
    /// Either side may be missing. A missing child is never added to the
    /// parent's `children`; a missing parent still becomes the child's
    /// `parentId`. A link that would make a tab its own ancestor is refused.
    /// This is bookkeeping, so `lastUpdated` is left alone.
    pub fn update_relationship(&mut self, child_id: &str, parent_id: &str) -> Result<()> {
        let child_id = canonical_id(child_id);
        let parent_id = canonical_id(parent_id);
        let mut tabs = self.get_tabs()?;

        if trail::creates_cycle(&tabs, &child_id, &parent_id) {
            warn!(
                "Storage: refusing relationship {} → {}: would create a cycle",
                child_id, parent_id
            );
            return Ok(());
        }

        let Some(child) = tabs.get_mut(&child_id) else {
            warn!("Storage: child tab not found: {}", child_id);
            return Ok(());
        };
        let previous_parent = child.parent_id.replace(parent_id.clone());

        if let Some(previous) = previous_parent.filter(|p| *p != parent_id) {
            if let Some(old_parent) = tabs.get_mut(&previous) {
                old_parent.children.remove(&child_id);
                debug!("Storage: detached {} from previous parent {}", child_id, previous);
            }
        }

        match tabs.get_mut(&parent_id) {
            Some(parent) => {
                parent.children.insert(child_id.clone());
            }
            None => warn!("Storage: parent tab not found: {}", parent_id),
        }

        self.write_tabs(&tabs)?;
        info!("Storage: relationship saved {} → {}", child_id, parent_id);
        Ok(())
    }

    /// Whether linking `child_id` under `parent_id` would create a cycle.
    pub fn would_create_cycle(&self, child_id: &str, parent_id: &str) -> Result<bool> {
        let tabs = self.get_tabs()?;
        Ok(trail::creates_cycle(
            &tabs,
            &canonical_id(child_id),
            &canonical_id(parent_id),
        ))
    }

    /// Reconstruct the trail that led to `tab_id`.
    pub fn get_trail(&self, tab_id: &str) -> Result<Vec<TrailStep>> {
        let tabs = self.get_tabs()?;
        Ok(trail::build_trail(&tabs, &canonical_id(tab_id)))
    }

    // === Retention ===

    /// Delete records last seen more than `days` ago.
    ///
    /// Any record that is a parent or a child in a relationship survives
    /// regardless of age, so no chain is ever broken.
    pub fn evict_older_than(&mut self, days: u32) -> Result<EvictionReport> {
        let cutoff = self.now_ms() - i64::from(days) * MS_PER_DAY;
        let tabs = self.get_tabs()?;

        let mut in_relationship: HashSet<&str> = HashSet::new();
        for (id, record) in &tabs {
            if record.has_relationships() {
                in_relationship.insert(id.as_str());
            }
            if let Some(parent) = &record.parent_id {
                in_relationship.insert(parent.as_str());
            }
            in_relationship.extend(record.children.iter().map(String::as_str));
        }

        let mut report = EvictionReport {
            cutoff,
            ..EvictionReport::default()
        };
        let mut kept = BTreeMap::new();
        for (id, record) in &tabs {
            let is_recent = record.last_seen() >= cutoff;
            let is_related = in_relationship.contains(id.as_str());
            if is_recent || is_related {
                if !is_recent {
                    report.preserved_for_relationships += 1;
                }
                kept.insert(id.clone(), record.clone());
            } else {
                report.removed += 1;
            }
        }
        report.remaining = kept.len();

        if report.removed > 0 {
            self.write_tabs(&kept)?;
        }
        info!(
            "Storage: cleaned {} old tabs, preserved {} for relationships",
            report.removed, report.preserved_for_relationships
        );
        Ok(report)
    }

    // === Settings ===

    /// Get settings, falling back to defaults for anything unset.
    pub fn get_settings(&self) -> Result<Settings> {
        match self.backend.read(SETTINGS_KEY)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Settings::default()),
        }
    }

    /// Replace the stored settings.
    pub fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        settings.validate().map_err(Error::InvalidInput)?;
        let value = serde_json::to_value(settings)?;
        self.backend.write(SETTINGS_KEY, &value)
    }

    // === Maintenance ===

    /// Wipe every record and the settings.
    pub fn clear_all(&mut self) -> Result<()> {
        self.backend.clear()?;
        info!("Storage: all Tab Trail data cleared");
        Ok(())
    }

    /// Summarize the stored data.
    pub fn stats(&self) -> Result<StorageStats> {
        let tabs = self.get_tabs()?;
        let settings = self.backend.read(SETTINGS_KEY)?;

        let size_bytes = serde_json::to_string(&tabs)?.len()
            + match settings {
                Some(value) => serde_json::to_string(&value)?.len(),
                None => 0,
            };

        Ok(StorageStats {
            tab_count: tabs.len(),
            active_tabs: tabs
                .values()
                .filter(|t| t.status == TabStatus::Active)
                .count(),
            closed_tabs: tabs.values().filter(|t| t.is_closed()).count(),
            root_tabs: tabs.values().filter(|t| t.parent_id.is_none()).count(),
            total_pages: tabs.values().map(|t| 1 + t.history.len()).sum(),
            size_bytes,
        })
    }

    /// Get the storage location description.
    pub fn location(&self) -> String {
        self.backend.location()
    }

    /// Get the backend type name.
    pub fn backend_type(&self) -> &'static str {
        self.backend.backend_type()
    }
}

/// Open the backend of the given type rooted at `data_dir`.
pub fn open_backend(data_dir: &Path, backend_type: BackendType) -> Result<Box<dyn StorageBackend>> {
    Ok(match backend_type {
        BackendType::Memory => Box::new(MemoryBackend::new()),
        BackendType::File => Box::new(FileBackend::new(data_dir)),
        BackendType::Sqlite => Box::new(SqliteBackend::open(data_dir)?),
    })
}

/// Canonical string form of a tab id.
///
/// Browser tab ids are integers; numeric input is re-rendered so `" 007"`
/// and `"7"` name the same record. Anything else is kept as trimmed text.
pub fn canonical_id(id: &str) -> String {
    let trimmed = id.trim();
    match trimmed.parse::<i64>() {
        Ok(n) => n.to_string(),
        Err(_) => trimmed.to_string(),
    }
}
