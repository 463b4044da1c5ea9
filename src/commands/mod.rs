//! Command implementations for the Tab Trail CLI.
//!
//! Each command returns a result struct implementing [`CommandResult`], so
//! `main` can print it as JSON (default) or human-readable text.

use serde::Serialize;
use std::fmt::Write as _;
use std::io::BufRead;

use tracing::{info, warn};

use crate::browser::LiveTabs;
use crate::clock::format_ms;
use crate::config::{self, ResolvedConfig, TrailConfig};
use crate::events::BrowserEvent;
use crate::models::{Settings, TabRecord, TrailStep};
use crate::service::{Response, ResponseData, Service};
use crate::storage::{BackendType, EvictionReport, Storage, StorageStats, canonical_id};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "serialization failed: {}"}}"#, e))
}

/// Open the store described by `config`.
///
/// The memory backend always starts empty; persistent backends require
/// `tt init` to have created the data directory.
pub fn open_storage(config: &ResolvedConfig) -> Result<Storage> {
    match config.backend() {
        BackendType::Memory => Storage::init(config.data_dir(), BackendType::Memory),
        backend => Storage::open(config.data_dir(), backend),
    }
}

// === init ===

#[derive(Serialize)]
pub struct InitResult {
    pub data_dir: String,
    pub backend: String,
    pub location: String,
    /// Whether config.kdl was created by this run
    pub config_written: bool,
    pub settings: Settings,
}

impl CommandResult for InitResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Initialized Tab Trail in {}\n", self.data_dir);
        let _ = writeln!(out, "  backend:  {} ({})", self.backend, self.location);
        if self.config_written {
            let _ = writeln!(out, "  config:   wrote {}", config::CONFIG_FILE);
        }
        let _ = write!(
            out,
            "  settings: tracking {}, retention {} days, {} pages per tab",
            on_off(self.settings.tracking_enabled),
            self.settings.retention_days,
            self.settings.max_pages_per_tab
        );
        out
    }
}

/// Create the data directory and config.kdl, then seed settings.
pub fn init(config: &ResolvedConfig) -> Result<InitResult> {
    let data_dir = config.data_dir();
    let config_path = config.config_path();

    let config_written = !config_path.exists();
    if config_written {
        let file = TrailConfig {
            backend: Some(config.backend()),
            tracking_enabled: Some(config.tracking_enabled.value),
            retention_days: Some(config.retention_days.value),
            max_pages_per_tab: Some(config.max_pages_per_tab.value),
        };
        file.validate().map_err(Error::InvalidInput)?;
        config::write_config(data_dir, &file)?;
    }

    let mut storage = Storage::init(data_dir, config.backend())?;
    let settings = storage.initialize(&config.seed_settings())?;
    info!("Initialized Tab Trail at {}", storage.location());

    Ok(InitResult {
        data_dir: data_dir.display().to_string(),
        backend: storage.backend_type().to_string(),
        location: storage.location(),
        config_written,
        settings,
    })
}

// === ingest ===

/// Final line of `tt ingest` output.
#[derive(Debug, Default, Serialize)]
pub struct IngestSummary {
    pub events: usize,
    pub requests: usize,
    pub failed: usize,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a IngestSummary,
}

#[derive(Serialize)]
pub struct IngestResult {
    pub responses: Vec<Response>,
    pub summary: IngestSummary,
}

impl CommandResult for IngestResult {
    /// One JSON line per response, then a summary line.
    fn to_json(&self) -> String {
        let mut lines: Vec<String> = self.responses.iter().map(json_string).collect();
        lines.push(json_string(&SummaryLine {
            summary: &self.summary,
        }));
        lines.join("\n")
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        for response in &self.responses {
            let _ = writeln!(out, "{}", describe_response(response));
        }
        let _ = write!(
            out,
            "Ingested {} events and {} requests ({} failed)",
            self.summary.events, self.summary.requests, self.summary.failed
        );
        out
    }
}

fn describe_response(response: &Response) -> String {
    let message = response.message.as_deref().unwrap_or("");
    if !response.is_success() {
        return format!("error: {}", message);
    }
    match &response.data {
        Some(ResponseData::TabInfo { tab_count }) => format!("ok: {}", tab_count),
        Some(ResponseData::Trail { trail, current_tab }) => {
            let mut out = format!("ok: trail for tab {} ({} steps)", current_tab.id, trail.len());
            for (i, step) in trail.iter().enumerate() {
                let _ = write!(out, "\n  {}", format_step(i, step));
            }
            out
        }
        Some(ResponseData::AllTabs {
            tabs,
            previous_active_tab,
        }) => match previous_active_tab {
            Some(active) => format!("ok: {} tabs, previously active tab {}", tabs.len(), active.id),
            None => format!("ok: {} tabs", tabs.len()),
        },
        Some(ResponseData::Settings { settings }) => format!(
            "ok: trackingEnabled={} retentionDays={} maxPagesPerTab={}",
            settings.tracking_enabled, settings.retention_days, settings.max_pages_per_tab
        ),
        None => format!("ok: {}", message),
    }
}

/// Replay a JSONL stream through a fresh service over `storage`.
///
/// Lines with an `event` field are browser events; lines with an `action`
/// field are requests. Blank lines are skipped. A failing event is logged
/// and counted unless `fail_fast` is set.
pub fn ingest<R: BufRead>(
    storage: Storage,
    seed: &Settings,
    reader: R,
    fail_fast: bool,
) -> Result<IngestResult> {
    let mut service = Service::new(storage, LiveTabs::new());
    service.initialize(seed)?;

    let mut responses = Vec::new();
    let mut summary = IngestSummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        match ingest_line(&mut service, &line) {
            Ok(Some(response)) => {
                summary.requests += 1;
                responses.push(response);
            }
            Ok(None) => summary.events += 1,
            Err(e) if fail_fast => {
                return Err(Error::InvalidInput(format!("line {}: {}", line_no, e)));
            }
            Err(e) => {
                warn!("Ingest: line {} failed: {}", line_no, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Ingest: {} events, {} requests, {} failed",
        summary.events, summary.requests, summary.failed
    );
    Ok(IngestResult { responses, summary })
}

fn ingest_line(service: &mut Service<LiveTabs>, line: &str) -> Result<Option<Response>> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    if value.get("event").is_some() {
        let event: BrowserEvent = serde_json::from_value(value)?;
        service.handle_event(&event)?;
        Ok(None)
    } else if value.get("action").is_some() {
        Ok(Some(service.handle_message(value)))
    } else {
        Err(Error::InvalidInput(
            "expected an \"event\" or \"action\" field".to_string(),
        ))
    }
}

// === tabs ===

#[derive(Serialize)]
pub struct TabsResult {
    pub count: usize,
    pub tabs: Vec<TabRecord>,
}

impl CommandResult for TabsResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.tabs.is_empty() {
            return "No tabs tracked.".to_string();
        }
        let mut out = format!("{} tab(s):", self.count);
        for tab in &self.tabs {
            let _ = write!(
                out,
                "\n  {:>6} [{}] {} ({})",
                tab.id, tab.status, tab.title, tab.url
            );
            if let Some(parent) = &tab.parent_id {
                let _ = write!(out, " <- {}", parent);
            }
            if !tab.children.is_empty() {
                let children: Vec<&str> = tab.children.iter().map(String::as_str).collect();
                let _ = write!(out, " -> {}", children.join(", "));
            }
        }
        out
    }
}

/// List tracked tabs, oldest first. Closed tabs are hidden unless `all`.
pub fn tabs(storage: &Storage, all: bool) -> Result<TabsResult> {
    let mut tabs: Vec<TabRecord> = storage
        .get_tabs()?
        .into_values()
        .filter(|tab| all || !tab.is_closed())
        .collect();
    tabs.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));

    Ok(TabsResult {
        count: tabs.len(),
        tabs,
    })
}

// === trail ===

#[derive(Serialize)]
pub struct TrailResult {
    pub tab_id: String,
    pub trail: Vec<TrailStep>,
}

impl CommandResult for TrailResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Trail for tab {} ({} steps):", self.tab_id, self.trail.len());
        for (i, step) in self.trail.iter().enumerate() {
            let _ = write!(out, "\n  {}", format_step(i, step));
        }
        out
    }
}

fn format_step(index: usize, step: &TrailStep) -> String {
    format!(
        "{:>2}. {} [{}] {} - {}",
        index + 1,
        format_ms(step.timestamp),
        step.label(),
        step.title,
        step.url
    )
}

/// Reconstruct the trail for one tab.
pub fn trail(storage: &Storage, tab_id: &str) -> Result<TrailResult> {
    let tab_id = canonical_id(tab_id);
    if tab_id.is_empty() {
        return Err(Error::InvalidId("tab id must not be empty".to_string()));
    }
    if storage.get_tab(&tab_id)?.is_none() {
        return Err(Error::NotFound(format!("Tab not found: {}", tab_id)));
    }
    let trail = storage.get_trail(&tab_id)?;
    Ok(TrailResult { tab_id, trail })
}

// === stats ===

#[derive(Serialize)]
pub struct StatsResult {
    pub backend: String,
    pub location: String,
    #[serde(flatten)]
    pub stats: StorageStats,
    pub settings: Settings,
}

impl CommandResult for StatsResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Storage: {} ({})\n", self.backend, self.location);
        let _ = writeln!(
            out,
            "  tabs:   {} ({} active, {} closed, {} roots)",
            self.stats.tab_count,
            self.stats.active_tabs,
            self.stats.closed_tabs,
            self.stats.root_tabs
        );
        let _ = writeln!(out, "  pages:  {}", self.stats.total_pages);
        let _ = write!(out, "  size:   {} bytes", self.stats.size_bytes);
        out
    }
}

pub fn stats(storage: &Storage) -> Result<StatsResult> {
    Ok(StatsResult {
        backend: storage.backend_type().to_string(),
        location: storage.location(),
        stats: storage.stats()?,
        settings: storage.get_settings()?,
    })
}

// === evict ===

#[derive(Serialize)]
pub struct EvictResult {
    pub days: u32,
    #[serde(flatten)]
    pub report: EvictionReport,
}

impl CommandResult for EvictResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Removed {} tab(s) older than {} days; kept {} for relationships, {} remaining",
            self.report.removed,
            self.days,
            self.report.preserved_for_relationships,
            self.report.remaining
        )
    }
}

/// Apply the retention policy, defaulting to the stored `retentionDays`.
pub fn evict(storage: &mut Storage, days: Option<u32>) -> Result<EvictResult> {
    let days = match days {
        Some(0) => {
            return Err(Error::InvalidInput(
                "--days must be at least 1".to_string(),
            ));
        }
        Some(days) => days,
        None => storage.get_settings()?.retention_days,
    };
    let report = storage.evict_older_than(days)?;
    Ok(EvictResult { days, report })
}

// === clear ===

#[derive(Serialize)]
pub struct ClearResult {
    pub cleared: bool,
}

impl CommandResult for ClearResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        "All data cleared".to_string()
    }
}

pub fn clear(storage: &mut Storage, force: bool) -> Result<ClearResult> {
    if !force {
        return Err(Error::InvalidInput(
            "Refusing to clear all data without --force".to_string(),
        ));
    }
    storage.clear_all()?;
    Ok(ClearResult { cleared: true })
}

// === settings ===

#[derive(Serialize)]
pub struct SettingsResult {
    pub settings: Settings,
    /// Records removed by the retention pass a save triggers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evicted: Option<usize>,
}

impl CommandResult for SettingsResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "trackingEnabled: {}\nretentionDays:   {}\nmaxPagesPerTab:  {}",
            self.settings.tracking_enabled,
            self.settings.retention_days,
            self.settings.max_pages_per_tab
        );
        if let Some(evicted) = self.evicted.filter(|n| *n > 0) {
            let _ = write!(out, "\n(evicted {} old tab(s))", evicted);
        }
        out
    }
}

pub fn settings_show(storage: &Storage) -> Result<SettingsResult> {
    Ok(SettingsResult {
        settings: storage.get_settings()?,
        evicted: None,
    })
}

/// Change one setting and apply the retention policy with the result.
pub fn settings_set(storage: &mut Storage, key: &str, value: &str) -> Result<SettingsResult> {
    let mut settings = storage.get_settings()?;
    let invalid = |expected: &str| {
        Error::InvalidInput(format!("Invalid value for {}: {} ({})", key, value, expected))
    };

    match key {
        "trackingEnabled" | "tracking-enabled" => {
            settings.tracking_enabled = value.parse().map_err(|_| invalid("true or false"))?;
        }
        "retentionDays" | "retention-days" => {
            settings.retention_days = value.parse().map_err(|_| invalid("a number of days"))?;
        }
        "maxPagesPerTab" | "max-pages-per-tab" => {
            settings.max_pages_per_tab = value.parse().map_err(|_| invalid("a page count"))?;
        }
        _ => {
            return Err(Error::InvalidInput(format!(
                "Unknown setting: {} (expected trackingEnabled, retentionDays, maxPagesPerTab)",
                key
            )));
        }
    }

    storage.save_settings(&settings)?;
    let report = storage.evict_older_than(settings.retention_days)?;
    Ok(SettingsResult {
        settings,
        evicted: Some(report.removed),
    })
}

// === config ===

#[derive(Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

#[derive(Serialize)]
pub struct ConfigShowResult {
    pub config_path: String,
    pub entries: Vec<ConfigEntry>,
}

impl CommandResult for ConfigShowResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Config: {}", self.config_path);
        for entry in &self.entries {
            let _ = write!(
                out,
                "\n  {:<18} {} ({})",
                entry.key, entry.value, entry.source
            );
        }
        out
    }
}

pub fn config_show(config: &ResolvedConfig) -> ConfigShowResult {
    let entry = |key, value: String, source: &config::ValueSource| ConfigEntry {
        key,
        value,
        source: source.to_string(),
    };

    ConfigShowResult {
        config_path: config.config_path().display().to_string(),
        entries: vec![
            entry(
                "data-dir",
                config.data_dir().display().to_string(),
                &config.data_dir.source,
            ),
            entry(
                "backend",
                config.backend().to_string(),
                &config.backend.source,
            ),
            entry(
                "tracking-enabled",
                config.tracking_enabled.value.to_string(),
                &config.tracking_enabled.source,
            ),
            entry(
                "retention-days",
                config.retention_days.value.to_string(),
                &config.retention_days.source,
            ),
            entry(
                "max-pages-per-tab",
                config.max_pages_per_tab.value.to_string(),
                &config.max_pages_per_tab.source,
            ),
        ],
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
