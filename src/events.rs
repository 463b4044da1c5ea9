//! Browser events consumed by the tracker.
//!
//! Events are JSON objects with an `event` field for discrimination, so a
//! recorded session can be replayed line by line:
//!
//! ```json
//! {"event": "tab_created", "id": 2, "url": "https://c.com/", "openerTabId": 1}
//! {"event": "tab_updated", "id": 2, "url": "https://d.com/", "title": "D"}
//! {"event": "navigation_target", "sourceTabId": 1, "tabId": 3, "url": "https://x.com/"}
//! {"event": "tab_activated", "id": 2}
//! {"event": "tab_removed", "id": 2}
//! ```

use serde::{Deserialize, Serialize};

use crate::browser::TabDescriptor;

/// A navigation that opened (or will open) a new tab from an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationDetails {
    pub source_tab_id: i64,
    pub tab_id: i64,
    pub url: String,
}

/// Tab lifecycle and navigation events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// A tab was created.
    TabCreated(TabDescriptor),

    /// A tab's URL changed.
    TabUpdated {
        id: i64,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    /// A navigation created a new target tab.
    NavigationTarget(NavigationDetails),

    /// A tab gained focus.
    TabActivated { id: i64 },

    /// A tab was closed.
    TabRemoved { id: i64 },
}

impl BrowserEvent {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            BrowserEvent::TabCreated(_) => "tab_created",
            BrowserEvent::TabUpdated { .. } => "tab_updated",
            BrowserEvent::NavigationTarget(_) => "navigation_target",
            BrowserEvent::TabActivated { .. } => "tab_activated",
            BrowserEvent::TabRemoved { .. } => "tab_removed",
        }
    }

    /// Whether the event is subject to the tracking switch.
    ///
    /// Removals and focus changes are always recorded so tombstones and the
    /// previously active tab stay accurate.
    pub fn is_tracked(&self) -> bool {
        matches!(
            self,
            BrowserEvent::TabCreated(_)
                | BrowserEvent::TabUpdated { .. }
                | BrowserEvent::NavigationTarget(_)
        )
    }
}
