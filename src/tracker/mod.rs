//! Relationship tracker.
//!
//! Turns browser tab events into tab records and parent links. Two signals
//! can name a parent:
//! - the opener reference carried by a tab-created event
//! - a navigation-target event naming the exact source and target tabs
//!
//! Navigation events may arrive before the target tab is created (they are
//! buffered in [`PendingNavigations`]) or after it (the existing record is
//! corrected in place). When both signals disagree the navigation event wins,
//! and the first navigation event to claim a tab keeps it.
//!
//! All tracker state lives in [`TrackerState`], owned by the host and passed
//! the store and tab source on every call.

pub mod pending;

pub use pending::{PENDING_TTL_MS, PendingNavigation, PendingNavigations};

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::Result;
use crate::browser::{TabDescriptor, TabSource};
use crate::events::NavigationDetails;
use crate::models::{HistoryEntry, RecordSource, Resolution, TabRecord, TabStatus};
use crate::storage::Storage;
use crate::urls;

/// Title given to tabs created without one.
pub const DEFAULT_TITLE: &str = "New Tab";
/// Title given to backfilled openers without one.
pub const BACKFILL_TITLE: &str = "Parent Tab";
/// How far before its child a backfilled opener is dated (ms).
const BACKFILL_LEAD_MS: i64 = 1000;

/// Parent candidate found while handling a tab-created event.
struct ParentLink {
    parent_id: String,
    source: RecordSource,
}

/// Process-local tracker state.
#[derive(Debug, Default)]
pub struct TrackerState {
    pending: PendingNavigations,
    /// Tabs created this session, with their creation time
    recent_tabs: HashMap<String, i64>,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of navigations still waiting for their target tab.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The tab created most recently this session that is still open.
    pub fn most_recent_tab(&self) -> Option<&str> {
        self.recent_tabs
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(id, _)| id.as_str())
    }

    /// Handle a tab-created event.
    ///
    /// A tab that already has a parent is returned unchanged, so replays and
    /// duplicate events never rewrite a relationship.
    pub fn on_tab_created(
        &mut self,
        storage: &mut Storage,
        tabs: &dyn TabSource,
        tab: &TabDescriptor,
    ) -> Result<TabRecord> {
        let now = storage.now_ms();
        let id = tab.id.to_string();

        let existing = storage.get_tab(&id)?;
        if let Some(record) = &existing {
            if let Some(parent) = &record.parent_id {
                debug!(
                    "Tracker: tab {} already exists with parent {}, preserving relationship",
                    id, parent
                );
                return Ok(record.clone());
            }
        }

        let url = if tab.url.is_empty() {
            urls::NEW_TAB_URL
        } else {
            tab.url.as_str()
        };
        let title = if tab.title.is_empty() {
            DEFAULT_TITLE
        } else {
            tab.title.as_str()
        };

        let mut record = TabRecord::new(id.clone(), url, title, now);
        if let Some(previous) = existing {
            // Children may have been linked before this tab was first seen.
            record.children = previous.children;
            record.history = previous.history;
        }

        let mut link = self.opener_link(storage, tabs, tab)?;
        if link.is_none() {
            link = self.pending.take_match(url, now).map(|nav| {
                debug!("Tracker: matched pending navigation {:?}", nav);
                ParentLink {
                    parent_id: nav.source_tab_id.to_string(),
                    source: RecordSource::navigation(Some(nav.source_url)),
                }
            });
        }

        if let Some(candidate) = &link {
            if storage.would_create_cycle(&id, &candidate.parent_id)? {
                warn!(
                    "Tracker: ignoring parent {} for tab {}: would create a cycle",
                    candidate.parent_id, id
                );
                link = None;
            }
        }

        match link {
            Some(ParentLink { parent_id, source }) => {
                record.parent_id = Some(parent_id.clone());
                record.source = source;
                let record = storage.save_tab(&id, record)?;
                storage.update_relationship(&id, &parent_id)?;
                info!("Tracker: tab {} opened from {}", id, parent_id);
                self.recent_tabs.insert(id.clone(), now);
                storage
                    .get_tab(&id)
                    .map(|stored| stored.unwrap_or(record))
            }
            None => {
                debug!("Tracker: no valid parent found for tab {}, root tab", id);
                let record = storage.save_tab(&id, record)?;
                self.recent_tabs.insert(id, now);
                Ok(record)
            }
        }
    }

    /// Signal A: the opener reference, accepted only when the opener shows a web page.
    ///
    /// Backfills a record for an opener the store has never seen.
    fn opener_link(
        &self,
        storage: &mut Storage,
        tabs: &dyn TabSource,
        tab: &TabDescriptor,
    ) -> Result<Option<ParentLink>> {
        let opener_id = match tab.opener_tab_id {
            Some(opener) if opener > 0 && opener != tab.id => opener,
            _ => return Ok(None),
        };

        let opener = match tabs.get_tab(opener_id) {
            Ok(opener) => opener,
            Err(e) => {
                debug!("Tracker: could not get opener tab info: {}", e);
                return Ok(None);
            }
        };

        if !urls::is_web_page(&opener.url) {
            debug!("Tracker: ignoring non-web opener: {}", opener.url);
            return Ok(None);
        }

        let parent_id = opener_id.to_string();
        if storage.get_tab(&parent_id)?.is_none() {
            let title = if opener.title.is_empty() {
                BACKFILL_TITLE
            } else {
                opener.title.as_str()
            };
            let mut backfill = TabRecord::new(
                parent_id.clone(),
                &opener.url,
                title,
                storage.now_ms() - BACKFILL_LEAD_MS,
            );
            backfill.source = RecordSource::backfill();
            storage.save_tab(&parent_id, backfill)?;
            info!("Tracker: backfilled missing parent tab {}", parent_id);
        }

        Ok(Some(ParentLink {
            parent_id,
            source: RecordSource::opener(),
        }))
    }

    /// Handle a tab URL change.
    ///
    /// The page being left is pushed onto the history when it is a real web
    /// page. The parent link is never touched here. An unknown tab is
    /// created on the spot.
    pub fn on_tab_updated(
        &mut self,
        storage: &mut Storage,
        tabs: &dyn TabSource,
        tab_id: i64,
        url: &str,
        title: Option<&str>,
    ) -> Result<Option<TabRecord>> {
        if url.is_empty() {
            return storage.get_tab(&tab_id.to_string());
        }

        let id = tab_id.to_string();
        let title = title.filter(|t| !t.is_empty()).unwrap_or(url);

        let mut record = match storage.get_tab(&id)? {
            Some(record) => record,
            None => {
                debug!("Tracker: creating missing tab entry during navigation: {}", id);
                let mut live = tabs
                    .get_tab(tab_id)
                    .unwrap_or_else(|_| TabDescriptor::new(tab_id, url, title));
                live.url = url.to_string();
                live.title = title.to_string();
                return self.on_tab_created(storage, tabs, &live).map(Some);
            }
        };

        if record.url != url && urls::is_web_page(&record.url) {
            let max_pages = storage.get_settings()?.max_pages_per_tab;
            record.history.push(HistoryEntry {
                url: record.url.clone(),
                title: record.title.clone(),
                timestamp: record.last_seen(),
            });
            if record.history.len() > max_pages {
                let excess = record.history.len() - max_pages;
                record.history.drain(..excess);
            }
            debug!("Tracker: added to history of {}: {}", id, record.url);
        }

        record.url = url.to_string();
        record.title = title.to_string();
        record.domain = urls::domain_of(url);

        storage.save_tab(&id, record).map(Some)
    }

    /// Handle a navigation-target event.
    ///
    /// Buffers the navigation for a tab that has not been created yet, and
    /// corrects the parent of a tab that already has been.
    pub fn on_navigation_target(
        &mut self,
        storage: &mut Storage,
        tabs: &dyn TabSource,
        details: &NavigationDetails,
    ) -> Result<()> {
        if details.source_tab_id < 0 || details.tab_id == details.source_tab_id {
            debug!("Tracker: ignoring navigation {:?}", details);
            return Ok(());
        }

        let source = match tabs.get_tab(details.source_tab_id) {
            Ok(source) => source,
            Err(e) => {
                warn!("Tracker: could not validate navigation source: {}", e);
                return Ok(());
            }
        };
        if !urls::is_web_page(&source.url) {
            debug!(
                "Tracker: ignoring navigation from non-web source: {}",
                source.url
            );
            return Ok(());
        }

        let now = storage.now_ms();
        self.pending.insert(
            PendingNavigation {
                source_tab_id: details.source_tab_id,
                target_tab_id: details.tab_id,
                url: details.url.clone(),
                source_url: source.url.clone(),
                timestamp: now,
            },
            now,
        );
        debug!(
            "Tracker: stored navigation {} from {} to {}",
            details.url, details.source_tab_id, details.tab_id
        );

        let child_id = details.tab_id.to_string();
        let parent_id = details.source_tab_id.to_string();
        let Some(child) = storage.get_tab(&child_id)? else {
            return Ok(());
        };

        let same_parent = child.parent_id.as_deref() == Some(parent_id.as_str());
        match child.resolution() {
            Resolution::ResolvedByNavigation if same_parent => return Ok(()),
            Resolution::ResolvedByNavigation => {
                debug!(
                    "Tracker: tab {} already resolved by navigation to {:?}, ignoring {}",
                    child_id, child.parent_id, parent_id
                );
                return Ok(());
            }
            Resolution::Unresolved | Resolution::ResolvedByOpener => {}
        }

        if storage.would_create_cycle(&child_id, &parent_id)? {
            warn!(
                "Tracker: rejecting navigation parent {} for tab {}: would create a cycle",
                parent_id, child_id
            );
            return Ok(());
        }

        // The navigation tag goes on only once the new parent is stored, so a
        // failed link leaves the tab open to the next navigation event.
        storage.update_relationship(&child_id, &parent_id)?;
        if let Some(mut child) = storage.get_tab(&child_id)? {
            child.source = RecordSource::navigation(Some(source.url));
            storage.save_tab(&child_id, child)?;
        }
        info!(
            "Tracker: updated existing tab {} relationship via navigation to {}",
            child_id, parent_id
        );
        Ok(())
    }

    /// Handle a tab-removed event. The record stays behind as a tombstone.
    pub fn on_tab_removed(&mut self, storage: &mut Storage, tab_id: i64) -> Result<Option<TabRecord>> {
        let id = tab_id.to_string();
        self.recent_tabs.remove(&id);

        let Some(mut record) = storage.get_tab(&id)? else {
            debug!("Tracker: removed tab {} was never tracked", id);
            return Ok(None);
        };

        record.status = TabStatus::Closed;
        record.closed_at = Some(storage.now_ms());
        let record = storage.save_tab(&id, record)?;
        debug!("Tracker: marked tab {} as closed", id);
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::LiveTabs;
    use crate::models::{Settings, SourceMethod, SourceType};
    use crate::test_utils::{T0, TestEnv, WriteBudget};

    struct Harness {
        env: TestEnv,
        tabs: LiveTabs,
        tracker: TrackerState,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_env(TestEnv::new())
        }

        fn with_env(env: TestEnv) -> Self {
            Self {
                env,
                tabs: LiveTabs::new(),
                tracker: TrackerState::new(),
            }
        }

        fn open(&mut self, tab: TabDescriptor) -> TabRecord {
            self.tabs.upsert(tab.clone());
            self.tracker
                .on_tab_created(&mut self.env.storage, &self.tabs, &tab)
                .unwrap()
        }

        fn navigate(&mut self, id: i64, url: &str) -> TabRecord {
            self.tabs.upsert(TabDescriptor::new(id, url, url));
            self.tracker
                .on_tab_updated(&mut self.env.storage, &self.tabs, id, url, None)
                .unwrap()
                .unwrap()
        }

        fn nav_target(&mut self, source: i64, target: i64, url: &str) {
            self.tracker
                .on_navigation_target(
                    &mut self.env.storage,
                    &self.tabs,
                    &NavigationDetails {
                        source_tab_id: source,
                        tab_id: target,
                        url: url.to_string(),
                    },
                )
                .unwrap();
        }

        fn record(&self, id: &str) -> TabRecord {
            self.env.storage.get_tab(id).unwrap().unwrap()
        }
    }

    #[test]
    fn test_opener_becomes_parent() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        let child = h.open(TabDescriptor::new(2, "https://b.com/", "B").with_opener(1));

        assert_eq!(child.parent_id.as_deref(), Some("1"));
        assert_eq!(child.source.method, Some(SourceMethod::OpenerTabId));
        assert_eq!(child.resolution(), Resolution::ResolvedByOpener);
        assert!(h.record("1").children.contains("2"));
    }

    #[test]
    fn test_non_web_opener_is_ignored() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, urls::NEW_TAB_URL, "New Tab"));
        h.open(TabDescriptor::new(3, "chrome-extension://id/explorer.html", "Explorer"));

        let from_new_tab = h.open(TabDescriptor::new(2, "https://b.com/", "B").with_opener(1));
        let from_extension = h.open(TabDescriptor::new(4, "https://c.com/", "C").with_opener(3));

        assert_eq!(from_new_tab.parent_id, None);
        assert_eq!(from_extension.parent_id, None);
        assert!(h.record("1").children.is_empty());
    }

    #[test]
    fn test_missing_opener_record_is_backfilled() {
        let mut h = Harness::new();
        h.tabs.upsert(TabDescriptor::new(1, "https://a.com/", ""));

        let child = h.open(TabDescriptor::new(2, "https://b.com/", "B").with_opener(1));
        assert_eq!(child.parent_id.as_deref(), Some("1"));

        let parent = h.record("1");
        assert_eq!(parent.source.kind, SourceType::Backfill);
        assert_eq!(parent.source.method, Some(SourceMethod::MissingParent));
        assert_eq!(parent.created, T0 - 1000);
        assert_eq!(parent.title, BACKFILL_TITLE);
        assert!(parent.children.contains("2"));
    }

    #[test]
    fn test_vanished_opener_is_no_signal() {
        let mut h = Harness::new();
        let child = h.open(TabDescriptor::new(2, "https://b.com/", "B").with_opener(9));

        assert_eq!(child.parent_id, None);
        assert!(h.env.storage.get_tab("9").unwrap().is_none());
    }

    #[test]
    fn test_zero_opener_falls_through() {
        let mut h = Harness::new();
        let child = h.open(TabDescriptor::new(2, "https://b.com/", "B").with_opener(0));
        assert_eq!(child.parent_id, None);
    }

    #[test]
    fn test_defaults_for_blank_tab() {
        let mut h = Harness::new();
        let record = h.open(TabDescriptor::new(5, "", ""));
        assert_eq!(record.url, urls::NEW_TAB_URL);
        assert_eq!(record.title, DEFAULT_TITLE);
        assert_eq!(record.source, RecordSource::unknown());
    }

    #[test]
    fn test_creation_is_idempotent_for_parented_tabs() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        let first = h.open(TabDescriptor::new(2, "https://b.com/", "B").with_opener(1));

        h.env.advance(500);
        let second = h.open(TabDescriptor::new(2, "https://other.com/", "O"));

        assert_eq!(first, second);
        assert_eq!(h.record("1").children.len(), 1);
    }

    #[test]
    fn test_recreating_root_keeps_children() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.open(TabDescriptor::new(2, "https://b.com/", "B").with_opener(1));

        let again = h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        assert!(again.children.contains("2"));
    }

    #[test]
    fn test_pending_navigation_matches_later_creation() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(5, "https://source.com/", "S"));
        h.nav_target(5, 7, "https://x.com/page");
        assert_eq!(h.tracker.pending_len(), 1);

        h.env.advance(1000);
        let child = h.open(TabDescriptor::new(7, "https://x.com/page", "X"));

        assert_eq!(child.parent_id.as_deref(), Some("5"));
        assert_eq!(child.source.method, Some(SourceMethod::WebNavigation));
        assert_eq!(
            child.source.parent_url.as_deref(),
            Some("https://source.com/")
        );
        assert_eq!(child.resolution(), Resolution::ResolvedByNavigation);
        assert_eq!(h.tracker.pending_len(), 0);
        assert!(h.record("5").children.contains("7"));
    }

    #[test]
    fn test_pending_navigation_matches_normalized_url() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(5, "https://source.com/", "S"));
        h.nav_target(5, 7, "http://x.com/page?id=2");

        let child = h.open(TabDescriptor::new(7, "https://x.com/page?id=2#top", "X"));
        assert_eq!(child.parent_id.as_deref(), Some("5"));
    }

    #[test]
    fn test_pending_navigation_expires() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(5, "https://source.com/", "S"));
        h.nav_target(5, 7, "https://x.com/page");

        h.env.advance(PENDING_TTL_MS);
        let child = h.open(TabDescriptor::new(7, "https://x.com/page", "X"));

        assert_eq!(child.parent_id, None);
        assert_eq!(h.tracker.pending_len(), 0);
    }

    #[test]
    fn test_opener_takes_precedence_over_pending_at_creation() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.open(TabDescriptor::new(5, "https://source.com/", "S"));
        h.nav_target(5, 7, "https://x.com/page");

        let child = h.open(TabDescriptor::new(7, "https://x.com/page", "X").with_opener(1));
        assert_eq!(child.parent_id.as_deref(), Some("1"));
        // Signal B is only consulted when Signal A did not apply.
        assert_eq!(h.tracker.pending_len(), 1);
    }

    #[test]
    fn test_navigation_after_creation_sets_parent() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.open(TabDescriptor::new(2, "https://b.com/", "B"));

        h.nav_target(1, 2, "https://b.com/");

        let child = h.record("2");
        assert_eq!(child.parent_id.as_deref(), Some("1"));
        assert_eq!(child.source.method, Some(SourceMethod::WebNavigation));
        assert!(h.record("1").children.contains("2"));
    }

    #[test]
    fn test_navigation_upgrades_opener_parent() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.open(TabDescriptor::new(2, "https://b.com/", "B"));
        h.open(TabDescriptor::new(3, "https://c.com/", "C").with_opener(1));

        h.nav_target(2, 3, "https://c.com/");

        assert_eq!(h.record("3").parent_id.as_deref(), Some("2"));
        assert!(h.record("2").children.contains("3"));
        assert!(h.record("1").children.is_empty());
    }

    #[test]
    fn test_failed_navigation_upgrade_can_be_retried() {
        let budget = WriteBudget::unlimited();
        let mut h = Harness::with_env(TestEnv::flaky(&budget));
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.open(TabDescriptor::new(2, "https://b.com/", "B"));
        h.open(TabDescriptor::new(3, "https://c.com/", "C").with_opener(1));
        let details = NavigationDetails {
            source_tab_id: 2,
            tab_id: 3,
            url: "https://c.com/".to_string(),
        };

        // Nothing written: the opener link is untouched.
        budget.set(0);
        assert!(
            h.tracker
                .on_navigation_target(&mut h.env.storage, &h.tabs, &details)
                .is_err()
        );
        let child = h.record("3");
        assert_eq!(child.parent_id.as_deref(), Some("1"));
        assert_eq!(child.resolution(), Resolution::ResolvedByOpener);

        // Link stored, tag write lost: the tab is not yet claimed by navigation.
        budget.set(1);
        assert!(
            h.tracker
                .on_navigation_target(&mut h.env.storage, &h.tabs, &details)
                .is_err()
        );
        let child = h.record("3");
        assert_eq!(child.parent_id.as_deref(), Some("2"));
        assert_eq!(child.resolution(), Resolution::ResolvedByOpener);

        budget.set(usize::MAX);
        h.nav_target(2, 3, "https://c.com/");
        let child = h.record("3");
        assert_eq!(child.parent_id.as_deref(), Some("2"));
        assert_eq!(child.resolution(), Resolution::ResolvedByNavigation);
        assert!(h.record("2").children.contains("3"));
        assert!(h.record("1").children.is_empty());
    }

    #[test]
    fn test_first_navigation_writer_wins() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.open(TabDescriptor::new(2, "https://b.com/", "B"));
        h.open(TabDescriptor::new(3, "https://c.com/", "C"));

        h.nav_target(1, 3, "https://c.com/");
        h.nav_target(2, 3, "https://c.com/");

        assert_eq!(h.record("3").parent_id.as_deref(), Some("1"));
        assert!(h.record("2").children.is_empty());
    }

    #[test]
    fn test_navigation_cannot_create_cycle() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.open(TabDescriptor::new(2, "https://b.com/", "B").with_opener(1));

        h.nav_target(2, 1, "https://a.com/");

        assert_eq!(h.record("1").parent_id, None);
        assert_eq!(h.record("2").parent_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_invalid_navigations_are_ignored() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.open(TabDescriptor::new(2, "chrome://settings/", "Settings"));

        h.nav_target(1, 1, "https://a.com/");
        h.nav_target(-1, 3, "https://x.com/");
        h.nav_target(2, 3, "https://x.com/");
        h.nav_target(9, 3, "https://x.com/");

        assert_eq!(h.tracker.pending_len(), 0);
        assert_eq!(h.record("1").parent_id, None);
    }

    #[test]
    fn test_update_pushes_history_and_keeps_parent() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.open(TabDescriptor::new(2, "https://b.com/", "B").with_opener(1));

        h.env.advance(1000);
        let updated = h.navigate(2, "https://b.com/next");

        assert_eq!(updated.parent_id.as_deref(), Some("1"));
        assert_eq!(updated.url, "https://b.com/next");
        assert_eq!(updated.title, "https://b.com/next");
        assert_eq!(updated.last_updated, T0 + 1000);
        assert_eq!(updated.history.len(), 1);
        assert_eq!(updated.history[0].url, "https://b.com/");
        assert_eq!(updated.history[0].title, "B");
        assert_eq!(updated.history[0].timestamp, T0);
    }

    #[test]
    fn test_update_from_new_tab_skips_history() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "", ""));
        let updated = h.navigate(1, "https://a.com/");

        assert!(updated.history.is_empty());
        assert_eq!(updated.domain, "a.com");
    }

    #[test]
    fn test_same_url_update_skips_history() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        let updated = h.navigate(1, "https://a.com/");
        assert!(updated.history.is_empty());
    }

    #[test]
    fn test_history_is_capped() {
        let mut h = Harness::new();
        h.env
            .storage
            .save_settings(&Settings {
                max_pages_per_tab: 3,
                ..Settings::default()
            })
            .unwrap();

        h.open(TabDescriptor::new(1, "https://site.com/0", "0"));
        for page in 1..=5 {
            h.env.advance(1000);
            h.navigate(1, &format!("https://site.com/{}", page));
        }

        let record = h.record("1");
        let history: Vec<&str> = record.history.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            history,
            vec!["https://site.com/2", "https://site.com/3", "https://site.com/4"]
        );
    }

    #[test]
    fn test_update_of_unknown_tab_creates_it() {
        let mut h = Harness::new();
        h.tabs.upsert(TabDescriptor::new(1, "https://a.com/", "A"));
        h.tabs
            .upsert(TabDescriptor::new(2, "https://b.com/", "B").with_opener(1));
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));

        let created = h
            .tracker
            .on_tab_updated(&mut h.env.storage, &h.tabs, 2, "https://b.com/x", Some("BX"))
            .unwrap()
            .unwrap();

        assert_eq!(created.url, "https://b.com/x");
        assert_eq!(created.title, "BX");
        assert_eq!(created.parent_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_removal_leaves_tombstone() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.open(TabDescriptor::new(2, "https://b.com/", "B").with_opener(1));
        assert_eq!(h.tracker.most_recent_tab(), Some("2"));

        h.env.advance(2000);
        let closed = h
            .tracker
            .on_tab_removed(&mut h.env.storage, 2)
            .unwrap()
            .unwrap();

        assert!(closed.is_closed());
        assert_eq!(closed.closed_at, Some(T0 + 2000));
        assert_eq!(closed.parent_id.as_deref(), Some("1"));
        assert!(h.record("1").children.contains("2"));
        assert_eq!(h.tracker.most_recent_tab(), Some("1"));

        assert!(h.tracker.on_tab_removed(&mut h.env.storage, 42).unwrap().is_none());
    }

    #[test]
    fn test_navigation_then_child_trail() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.env.advance(1000);
        h.navigate(1, "https://b.com/");
        h.env.advance(1000);
        h.open(TabDescriptor::new(2, "https://c.com/", "C").with_opener(1));

        let trail = h.env.storage.get_trail("2").unwrap();
        let urls: Vec<&str> = trail.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com/", "https://b.com/", "https://c.com/"]);

        assert!(trail[0].is_history && trail[0].is_parent_history);
        assert!(trail[1].is_parent);
        assert!(trail[2].is_current);
    }

    #[test]
    fn test_eviction_keeps_chain_after_tracking() {
        let mut h = Harness::new();
        h.open(TabDescriptor::new(1, "https://a.com/", "A"));
        h.open(TabDescriptor::new(2, "https://b.com/", "B").with_opener(1));
        h.open(TabDescriptor::new(3, "https://c.com/", "C"));

        h.env.advance(30 * 24 * 60 * 60 * 1000);
        let report = h.env.storage.evict_older_than(7).unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(h.env.storage.get_trail("2").unwrap().len(), 2);
        assert!(h.env.storage.get_tab("3").unwrap().is_none());
    }
}
