//! Short-lived table of navigations waiting for their target tab.
//!
//! A navigation-target event can arrive before or after the matching
//! tab-created event. Entries are keyed by target URL and expire
//! [`PENDING_TTL_MS`] after they were recorded. There are no timers: every
//! access sweeps expired entries against the caller's `now`.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::urls;

/// How long a pending navigation stays matchable (ms).
pub const PENDING_TTL_MS: i64 = 3000;

/// A navigation whose target tab has not been matched yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNavigation {
    pub source_tab_id: i64,
    pub target_tab_id: i64,
    pub url: String,
    /// URL the source tab showed when the navigation started
    pub source_url: String,
    /// When the navigation was recorded (epoch ms)
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
struct Slot {
    nav: PendingNavigation,
    seq: u64,
}

/// Pending navigations indexed by URL and by expiry.
#[derive(Debug, Default)]
pub struct PendingNavigations {
    by_url: HashMap<String, Slot>,
    expiry: BTreeMap<(i64, u64), String>,
    next_seq: u64,
}

impl PendingNavigations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a navigation. A later navigation to the same URL replaces the earlier one.
    pub fn insert(&mut self, nav: PendingNavigation, now: i64) {
        self.sweep(now);

        let seq = self.next_seq;
        self.next_seq += 1;

        let url = nav.url.clone();
        self.expiry.insert((now + PENDING_TTL_MS, seq), url.clone());
        self.by_url.insert(url, Slot { nav, seq });
    }

    /// Consume the navigation matching `url`.
    ///
    /// An exact URL match wins; otherwise the most recent entry whose
    /// normalized URL matches is taken.
    pub fn take_match(&mut self, url: &str, now: i64) -> Option<PendingNavigation> {
        self.sweep(now);
        if url.is_empty() {
            return None;
        }

        if let Some(slot) = self.by_url.remove(url) {
            return Some(slot.nav);
        }

        let key = self
            .by_url
            .iter()
            .filter(|(pending_url, _)| urls::urls_match(pending_url, url))
            .max_by_key(|(_, slot)| (slot.nav.timestamp, slot.seq))
            .map(|(pending_url, _)| pending_url.clone())?;

        self.by_url.remove(&key).map(|slot| slot.nav)
    }

    /// Drop every entry whose time-to-live has elapsed at `now`.
    pub fn sweep(&mut self, now: i64) {
        while let Some(entry) = self.expiry.first_entry() {
            let (expires_at, seq) = *entry.key();
            if expires_at > now {
                break;
            }
            let url = entry.remove();
            // Replaced or consumed entries leave stale expiry keys behind.
            if self.by_url.get(&url).is_some_and(|slot| slot.seq == seq) {
                self.by_url.remove(&url);
                debug!("Tracker: pending navigation expired: {}", url);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}
