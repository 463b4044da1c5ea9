//! Extension service: the event loop body and the message interface.
//!
//! [`Service`] owns everything a running extension holds between events:
//! the record store, the tracker state, the browser tab source, and the
//! previously active tab. Hosts feed it [`BrowserEvent`]s and [`Request`]s
//! one at a time; a failed event is logged and the next one proceeds.

pub mod protocol;

pub use protocol::{ActiveTab, Request, Response, ResponseData, Status};

use tracing::{debug, warn};

use crate::Result;
use crate::browser::{TabDescriptor, TabSource};
use crate::events::BrowserEvent;
use crate::models::Settings;
use crate::storage::Storage;
use crate::tracker::TrackerState;
use crate::urls;

/// Summary line returned by `getTabInfo`.
pub const TAB_INFO_MESSAGE: &str = "Tab Trail is tracking your tabs!";

/// A running Tab Trail instance.
pub struct Service<T: TabSource> {
    storage: Storage,
    tracker: TrackerState,
    tabs: T,
    previous_active_tab: Option<ActiveTab>,
}

impl<T: TabSource> Service<T> {
    pub fn new(storage: Storage, tabs: T) -> Self {
        Self {
            storage,
            tracker: TrackerState::new(),
            tabs,
            previous_active_tab: None,
        }
    }

    /// Seed settings on first start.
    pub fn initialize(&mut self, defaults: &Settings) -> Result<Settings> {
        self.storage.initialize(defaults)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn tracker(&self) -> &TrackerState {
        &self.tracker
    }

    /// The last activated tab that showed a real web page.
    pub fn previous_active_tab(&self) -> Option<&ActiveTab> {
        self.previous_active_tab.as_ref()
    }

    /// Apply one browser event.
    ///
    /// Creation, update, and navigation events are skipped while tracking is
    /// disabled; removal and activation are always applied.
    pub fn handle_event(&mut self, event: &BrowserEvent) -> Result<()> {
        let now = self.storage.now_ms();
        self.tabs.observe(event, now);

        if event.is_tracked() && !self.storage.get_settings()?.tracking_enabled {
            debug!("Service: tracking disabled, skipping {}", event.name());
            return Ok(());
        }

        match event {
            BrowserEvent::TabCreated(tab) => {
                self.tracker
                    .on_tab_created(&mut self.storage, &self.tabs, tab)?;
            }
            BrowserEvent::TabUpdated { id, url, title } => {
                self.tracker.on_tab_updated(
                    &mut self.storage,
                    &self.tabs,
                    *id,
                    url,
                    title.as_deref(),
                )?;
            }
            BrowserEvent::NavigationTarget(details) => {
                self.tracker
                    .on_navigation_target(&mut self.storage, &self.tabs, details)?;
            }
            BrowserEvent::TabActivated { id } => self.on_tab_activated(*id),
            BrowserEvent::TabRemoved { id } => {
                self.tracker.on_tab_removed(&mut self.storage, *id)?;
            }
        }
        Ok(())
    }

    /// Remember the activated tab if it shows a real web page.
    fn on_tab_activated(&mut self, tab_id: i64) {
        match self.tabs.get_tab(tab_id) {
            Ok(tab) if is_user_page(&tab) => {
                debug!("Service: stored previous active tab {} ({})", tab.id, tab.title);
                self.previous_active_tab = Some(ActiveTab::from(&tab));
            }
            Ok(tab) => debug!("Service: skipping non-web tab {} ({})", tab.id, tab.url),
            Err(e) => warn!("Service: error in tab activation: {}", e),
        }
    }

    /// Answer a message. Failures become error responses.
    pub fn handle_request(&mut self, request: Request) -> Response {
        let action = request.action();
        match self.dispatch(request) {
            Ok(response) => response,
            Err(e) => {
                warn!("Service: error handling {}: {}", action, e);
                Response::error(e.to_string())
            }
        }
    }

    /// Parse and answer a raw JSON message.
    pub fn handle_message(&mut self, message: serde_json::Value) -> Response {
        match Request::parse(message) {
            Ok(request) => self.handle_request(request),
            Err(response) => response,
        }
    }

    fn dispatch(&mut self, request: Request) -> Result<Response> {
        match request {
            Request::GetTabInfo => {
                let count = self.storage.get_tabs()?.len();
                Ok(Response::success(ResponseData::TabInfo {
                    tab_count: format!("Tracking {} tabs", count),
                })
                .with_message(TAB_INFO_MESSAGE))
            }
            Request::GetCurrentTrail => self.current_trail(),
            Request::GetAllTabs => Ok(Response::success(ResponseData::AllTabs {
                tabs: self.storage.get_tabs()?,
                previous_active_tab: self.best_previous_active_tab(),
            })),
            Request::ClearData => {
                self.storage.clear_all()?;
                Ok(Response::message("All data cleared"))
            }
            Request::GetSettings => Ok(Response::success(ResponseData::Settings {
                settings: self.storage.get_settings()?,
            })),
            Request::SaveSettings { settings } => {
                self.storage.save_settings(&settings)?;
                self.storage.evict_older_than(settings.retention_days)?;
                Ok(Response::message("Settings saved"))
            }
        }
    }

    /// Trail for the focused tab, with its final step refreshed from the live tab.
    fn current_trail(&self) -> Result<Response> {
        let Some(current) = self.tabs.current_tab()? else {
            return Ok(Response::error("No active tab found"));
        };

        let mut trail = self.storage.get_trail(&current.id.to_string())?;
        if let Some(last) = trail.last_mut().filter(|step| step.is_current) {
            last.url = current.url.clone();
            last.title = current.title.clone();
            last.domain = urls::display_domain(&current.url);
        }

        Ok(Response::success(ResponseData::Trail {
            trail,
            current_tab: current,
        }))
    }

    /// The remembered previously active tab, or else the most recently
    /// accessed open web page.
    fn best_previous_active_tab(&self) -> Option<ActiveTab> {
        if let Some(tab) = &self.previous_active_tab {
            return Some(tab.clone());
        }

        debug!("Service: no previous active tab stored, searching open tabs");
        match self.tabs.list_tabs() {
            Ok(tabs) => tabs
                .iter()
                .filter(|tab| is_user_page(tab))
                .max_by_key(|tab| tab.last_accessed.unwrap_or(0))
                .map(ActiveTab::from),
            Err(e) => {
                warn!("Service: error finding fallback previous active tab: {}", e);
                None
            }
        }
    }
}

/// Whether a live tab is a page the user was reading, not a browser or extension page.
fn is_user_page(tab: &TabDescriptor) -> bool {
    !tab.url.is_empty() && !urls::is_internal(&tab.url) && !tab.title.trim().is_empty()
}
