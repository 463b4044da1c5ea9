//! Message types exchanged between extension pages and the service.
//!
//! # Protocol Overview
//!
//! Requests are JSON objects with an `action` field for discrimination.
//! Every response carries `status` (`"success"` or `"error"`); the remaining
//! fields depend on the action.
//!
//! ## Requests ([`Request`])
//! - `getTabInfo`: tracked-tab count summary
//! - `getCurrentTrail`: trail for the focused tab
//! - `getAllTabs`: every record plus the previously active tab
//! - `clearData`: wipe all stored data
//! - `getSettings` / `saveSettings`: read or replace the settings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::browser::TabDescriptor;
use crate::models::{Settings, TabRecord, TrailStep};

// ============================================================================
// Requests
// ============================================================================

/// Requests sent by the popup, explorer, and settings pages.
///
/// # Examples
///
/// ```json
/// {"action": "getCurrentTrail"}
/// {"action": "saveSettings", "settings": {"trackingEnabled": true, "retentionDays": 14}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetTabInfo,
    GetCurrentTrail,
    GetAllTabs,
    ClearData,
    GetSettings,
    /// Replace the settings. Missing fields take their defaults.
    SaveSettings { settings: Settings },
}

impl Request {
    /// Every action name the service understands.
    pub const ACTIONS: &'static [&'static str] = &[
        "getTabInfo",
        "getCurrentTrail",
        "getAllTabs",
        "clearData",
        "getSettings",
        "saveSettings",
    ];

    /// Parse a raw message.
    ///
    /// A message naming an unknown action (or none) is answered with the
    /// error response the pages expect, rather than a parse error.
    pub fn parse(message: serde_json::Value) -> std::result::Result<Self, Response> {
        let action = match message.get("action") {
            Some(serde_json::Value::String(action)) => action.clone(),
            Some(other) => other.to_string(),
            None => "undefined".to_string(),
        };

        if !Self::ACTIONS.contains(&action.as_str()) {
            return Err(Response::error(format!("Unknown action: {}", action)));
        }

        serde_json::from_value(message)
            .map_err(|e| Response::error(format!("Invalid {} request: {}", action, e)))
    }

    pub fn action(&self) -> &'static str {
        match self {
            Request::GetTabInfo => "getTabInfo",
            Request::GetCurrentTrail => "getCurrentTrail",
            Request::GetAllTabs => "getAllTabs",
            Request::ClearData => "clearData",
            Request::GetSettings => "getSettings",
            Request::SaveSettings { .. } => "saveSettings",
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Outcome flag carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
}

/// Identity of the tab the user was looking at before opening an extension page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTab {
    pub id: i64,
    pub url: String,
    pub title: String,
}

impl From<&TabDescriptor> for ActiveTab {
    fn from(tab: &TabDescriptor) -> Self {
        Self {
            id: tab.id,
            url: tab.url.clone(),
            title: tab.title.clone(),
        }
    }
}

/// Action-specific response fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    TabInfo {
        #[serde(rename = "tabCount")]
        tab_count: String,
    },
    Trail {
        trail: Vec<TrailStep>,
        #[serde(rename = "currentTab")]
        current_tab: TabDescriptor,
    },
    AllTabs {
        tabs: BTreeMap<String, TabRecord>,
        #[serde(rename = "previousActiveTab")]
        previous_active_tab: Option<ActiveTab>,
    },
    Settings {
        settings: Settings,
    },
}

/// Response to a [`Request`].
///
/// # Examples
///
/// ```json
/// {"status": "success", "message": "Settings saved"}
/// {"status": "success", "settings": {"trackingEnabled": true, "retentionDays": 7, "maxPagesPerTab": 50}}
/// {"status": "error", "message": "Unknown action: frobnicate"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: Status,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(flatten)]
    pub data: Option<ResponseData>,
}

impl Response {
    pub fn success(data: ResponseData) -> Self {
        Self {
            status: Status::Success,
            message: None,
            data: Some(data),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
