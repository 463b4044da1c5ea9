//! Browser tab queries.
//!
//! The tracker never talks to a browser directly. It asks a [`TabSource`] for
//! live tab descriptors (opener lookups, the focused tab, the full tab list).
//! An extension host implements the trait over its tabs API; the CLI replays
//! recorded sessions against [`LiveTabs`], a mirror kept current by the event
//! stream itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::events::BrowserEvent;
use crate::{Error, Result};

/// Live state of one browser tab, as the browser reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDescriptor {
    pub id: i64,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub title: String,

    /// Tab that was active when this one was spawned, if the browser knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_tab_id: Option<i64>,

    /// Last time the tab was focused (epoch ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<i64>,
}

impl TabDescriptor {
    pub fn new(id: i64, url: &str, title: &str) -> Self {
        Self {
            id,
            url: url.to_string(),
            title: title.to_string(),
            opener_tab_id: None,
            last_accessed: None,
        }
    }

    pub fn with_opener(mut self, opener: i64) -> Self {
        self.opener_tab_id = Some(opener);
        self
    }
}

/// Query interface over the browser's tabs.
pub trait TabSource {
    /// Fetch a tab by id. Fails with [`Error::TabLookup`] when the tab no longer exists.
    fn get_tab(&self, id: i64) -> Result<TabDescriptor>;

    /// The tab currently focused in the current window.
    fn current_tab(&self) -> Result<Option<TabDescriptor>>;

    /// Every open tab.
    fn list_tabs(&self) -> Result<Vec<TabDescriptor>>;

    /// Feed an event to sources that mirror browser state themselves.
    fn observe(&mut self, _event: &BrowserEvent, _now: i64) {}
}

/// In-memory mirror of open tabs, driven by the same events the tracker sees.
#[derive(Debug, Clone, Default)]
pub struct LiveTabs {
    tabs: BTreeMap<i64, TabDescriptor>,
    active: Option<i64>,
}

impl LiveTabs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tab.
    pub fn upsert(&mut self, tab: TabDescriptor) {
        self.tabs.insert(tab.id, tab);
    }

    /// Focus a tab.
    pub fn activate(&mut self, id: i64, now: i64) {
        if let Some(tab) = self.tabs.get_mut(&id) {
            tab.last_accessed = Some(now);
            self.active = Some(id);
        }
    }

    pub fn remove(&mut self, id: i64) {
        self.tabs.remove(&id);
        if self.active == Some(id) {
            self.active = None;
        }
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

impl TabSource for LiveTabs {
    fn get_tab(&self, id: i64) -> Result<TabDescriptor> {
        self.tabs
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::TabLookup(format!("No tab with id: {}", id)))
    }

    fn current_tab(&self) -> Result<Option<TabDescriptor>> {
        Ok(self.active.and_then(|id| self.tabs.get(&id).cloned()))
    }

    fn list_tabs(&self) -> Result<Vec<TabDescriptor>> {
        Ok(self.tabs.values().cloned().collect())
    }

    fn observe(&mut self, event: &BrowserEvent, now: i64) {
        match event {
            BrowserEvent::TabCreated(tab) => {
                self.upsert(tab.clone());
                // Focus stays on the first tab until an activation event moves it.
                if self.active.is_none() {
                    self.activate(tab.id, now);
                }
            }
            BrowserEvent::TabUpdated { id, url, title } => {
                let tab = self
                    .tabs
                    .entry(*id)
                    .or_insert_with(|| TabDescriptor::new(*id, "", ""));
                tab.url = url.clone();
                tab.title = title.clone().unwrap_or_else(|| url.clone());
            }
            BrowserEvent::TabActivated { id } => self.activate(*id, now),
            BrowserEvent::TabRemoved { id } => self.remove(*id),
            BrowserEvent::NavigationTarget(_) => {}
        }
    }
}
