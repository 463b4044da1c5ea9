//! Trail reconstruction.
//!
//! A trail is the chronological sequence of pages that led to a tab, spanning
//! the tab itself and every ancestor that opened it. Reconstruction is a pure
//! function of the record set, so the same store state always yields the same
//! trail.

use std::collections::{BTreeMap, HashSet};

use crate::models::{HistoryEntry, TabRecord, TrailStep};
use crate::urls;

/// Walk `parent_id` links from `tab_id` up to its root.
///
/// Returns the chain root-first, target-last. The walk stops at a missing
/// parent or at the first id it has already visited, so corrupted data with a
/// cycle still terminates.
pub fn ancestor_chain<'a>(
    tabs: &'a BTreeMap<String, TabRecord>,
    tab_id: &str,
) -> Vec<&'a TabRecord> {
    let mut chain = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut next = tabs.get_key_value(tab_id);

    while let Some((key, record)) = next {
        if !visited.insert(key.as_str()) {
            break;
        }
        chain.push(record);
        next = record
            .parent_id
            .as_deref()
            .and_then(|parent| tabs.get_key_value(parent));
    }

    chain.reverse();
    chain
}

/// Whether making `parent_id` the parent of `child_id` would close a loop.
///
/// True for self-references and whenever `child_id` already appears among
/// the ancestors of `parent_id`.
pub fn creates_cycle(tabs: &BTreeMap<String, TabRecord>, child_id: &str, parent_id: &str) -> bool {
    if child_id == parent_id {
        return true;
    }
    ancestor_chain(tabs, parent_id)
        .iter()
        .any(|record| record.id == child_id)
}

/// Build the trail for `tab_id`. Unknown tabs have an empty trail.
pub fn build_trail(tabs: &BTreeMap<String, TabRecord>, tab_id: &str) -> Vec<TrailStep> {
    let chain = ancestor_chain(tabs, tab_id);
    let target_position = match chain.len().checked_sub(1) {
        Some(position) => position,
        None => return Vec::new(),
    };

    let mut trail = Vec::new();
    for (position, record) in chain.iter().enumerate() {
        let is_target = position == target_position;

        trail.extend(history_steps(record, position, !is_target));

        let last_history_url = record.history.last().map(|entry| entry.url.as_str());
        if last_history_url != Some(record.url.as_str()) {
            trail.push(final_step(record, position, is_target));
        }
    }

    // Ancestors can stay active after a child opens, so steps from different
    // tabs may interleave. The sort is stable: equal timestamps keep chain order.
    trail.sort_by_key(|step| step.timestamp);
    trail
}

/// Deduplicated, time-ordered history steps for one record.
///
/// Entries with the same URL within the same second collapse to one, and
/// new-tab placeholders are dropped.
fn history_steps(record: &TabRecord, position: usize, is_ancestor: bool) -> Vec<TrailStep> {
    let mut seen: HashSet<(&str, i64)> = HashSet::new();
    let mut steps: Vec<TrailStep> = record
        .history
        .iter()
        .filter(|entry| !urls::is_new_tab(&entry.url))
        .filter(|entry| seen.insert((entry.url.as_str(), entry.timestamp.div_euclid(1000))))
        .map(|entry| history_step(record, entry, position, is_ancestor))
        .collect();

    steps.sort_by_key(|step| step.timestamp);
    steps
}

fn history_step(
    record: &TabRecord,
    entry: &HistoryEntry,
    position: usize,
    is_ancestor: bool,
) -> TrailStep {
    TrailStep {
        id: format!("{}-history-{}", record.id, entry.timestamp),
        tab_id: None,
        url: entry.url.clone(),
        title: entry.title.clone(),
        domain: urls::domain_of(&entry.url),
        timestamp: entry.timestamp,
        chain_position: position,
        is_history: true,
        is_parent_history: is_ancestor,
        is_parent: false,
        is_current: false,
    }
}

fn final_step(record: &TabRecord, position: usize, is_target: bool) -> TrailStep {
    TrailStep {
        id: record.id.clone(),
        tab_id: Some(record.id.clone()),
        url: record.url.clone(),
        title: record.title.clone(),
        domain: record.domain.clone(),
        timestamp: record.last_seen(),
        chain_position: position,
        is_history: false,
        is_parent_history: false,
        is_parent: !is_target,
        is_current: is_target,
    }
}
