//! Data models for Tab Trail entities.
//!
//! This module defines the core data structures:
//! - `TabRecord` - One browser tab ever observed, with its parent link and history
//! - `HistoryEntry` - A page a tab navigated away from
//! - `RecordSource` - Which signal established a record's parent (diagnostics only)
//! - `Settings` - User-facing tracking options
//! - `TrailStep` - One page in a reconstructed trail
//!
//! Records serialize as camelCase JSON so the persisted layout matches what the
//! extension pages read directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::urls;

/// Lifecycle state of a tab record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabStatus {
    #[default]
    Active,
    /// The tab is gone but its record is kept as a tombstone
    Closed,
}

impl fmt::Display for TabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabStatus::Active => write!(f, "active"),
            TabStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Broad category of the signal that produced a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[default]
    Unknown,
    /// Opened from another tab
    Link,
    /// Synthesized because a child referenced a tab we had never seen
    Backfill,
}

/// Specific signal behind a [`SourceType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceMethod {
    #[serde(rename = "openerTabId")]
    OpenerTabId,
    #[serde(rename = "webNavigation")]
    WebNavigation,
    #[serde(rename = "missing_parent")]
    MissingParent,
}

/// Provenance tag describing how a record's parent was established.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSource {
    #[serde(rename = "type")]
    pub kind: SourceType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<SourceMethod>,

    /// URL of the source tab when the parent came from a navigation event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_url: Option<String>,
}

impl RecordSource {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn opener() -> Self {
        Self {
            kind: SourceType::Link,
            method: Some(SourceMethod::OpenerTabId),
            parent_url: None,
        }
    }

    pub fn navigation(parent_url: Option<String>) -> Self {
        Self {
            kind: SourceType::Link,
            method: Some(SourceMethod::WebNavigation),
            parent_url,
        }
    }

    pub fn backfill() -> Self {
        Self {
            kind: SourceType::Backfill,
            method: Some(SourceMethod::MissingParent),
            parent_url: None,
        }
    }
}

/// How far a record's parent relationship has been resolved.
///
/// Ordered by signal specificity: a navigation-target event names the exact
/// source and target tabs, so it outranks the opener reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Resolution {
    Unresolved,
    ResolvedByOpener,
    ResolvedByNavigation,
}

/// A page a tab navigated away from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub url: String,

    #[serde(default)]
    pub title: String,

    /// When the tab arrived at this page (epoch ms)
    #[serde(default)]
    pub timestamp: i64,
}

/// A browser tab ever observed by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    /// String form of the browser-assigned tab id
    pub id: String,

    pub url: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub domain: String,

    /// Record that opened this tab
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Records whose `parent_id` points here (maintained by the store)
    #[serde(default)]
    pub children: BTreeSet<String>,

    /// Pages this tab navigated away from, oldest first
    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    #[serde(default)]
    pub status: TabStatus,

    /// Creation timestamp (epoch ms)
    pub created: i64,

    /// Last write timestamp (epoch ms)
    #[serde(default)]
    pub last_updated: i64,

    /// When the tab was removed (epoch ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,

    #[serde(default)]
    pub source: RecordSource,
}

impl TabRecord {
    /// Create a parentless record for a tab currently showing `url`.
    pub fn new(id: impl Into<String>, url: &str, title: &str, now: i64) -> Self {
        Self {
            id: id.into(),
            url: url.to_string(),
            title: title.to_string(),
            domain: urls::domain_of(url),
            parent_id: None,
            children: BTreeSet::new(),
            history: Vec::new(),
            status: TabStatus::Active,
            created: now,
            last_updated: now,
            closed_at: None,
            source: RecordSource::unknown(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == TabStatus::Closed
    }

    /// Current resolution state of this record's parent link.
    pub fn resolution(&self) -> Resolution {
        match (&self.parent_id, self.source.method) {
            (None, _) => Resolution::Unresolved,
            (Some(_), Some(SourceMethod::WebNavigation)) => Resolution::ResolvedByNavigation,
            (Some(_), _) => Resolution::ResolvedByOpener,
        }
    }

    /// Timestamp used for retention decisions.
    pub fn last_seen(&self) -> i64 {
        if self.last_updated > 0 {
            self.last_updated
        } else {
            self.created
        }
    }

    /// Whether this record takes part in any parent/child relationship.
    pub fn has_relationships(&self) -> bool {
        self.parent_id.is_some() || !self.children.is_empty()
    }
}

/// Default `retentionDays`.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;
/// Default `maxPagesPerTab`.
pub const DEFAULT_MAX_PAGES_PER_TAB: usize = 50;

/// User-facing tracking options, stored under the `settings` namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub tracking_enabled: bool,
    pub retention_days: u32,
    pub max_pages_per_tab: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tracking_enabled: true,
            retention_days: DEFAULT_RETENTION_DAYS,
            max_pages_per_tab: DEFAULT_MAX_PAGES_PER_TAB,
        }
    }
}

impl Settings {
    /// Validate the settings values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.retention_days == 0 {
            return Err("retentionDays must be at least 1".to_string());
        }
        if self.max_pages_per_tab == 0 {
            return Err("maxPagesPerTab must be at least 1".to_string());
        }
        Ok(())
    }
}

/// One page in a reconstructed trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailStep {
    /// Stable step id: the tab id for final pages, `<tab>-history-<ts>` otherwise
    pub id: String,

    /// Tab to focus when the step is opened; `None` for history pages
    pub tab_id: Option<String>,

    pub url: String,
    pub title: String,
    pub domain: String,

    /// When the page was reached (epoch ms)
    pub timestamp: i64,

    /// Index of the owning record in the ancestor chain (root = 0)
    pub chain_position: usize,

    #[serde(default)]
    pub is_history: bool,

    /// History step belonging to an ancestor of the target tab
    #[serde(default)]
    pub is_parent_history: bool,

    /// Final page of an ancestor tab
    #[serde(default)]
    pub is_parent: bool,

    /// Final page of the target tab itself
    #[serde(default)]
    pub is_current: bool,
}

impl TrailStep {
    /// Short label for human-readable listings.
    pub fn label(&self) -> &'static str {
        if self.is_current {
            "current"
        } else if self.is_parent {
            "parent"
        } else if self.is_history {
            "history"
        } else {
            "page"
        }
    }
}
