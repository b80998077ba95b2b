//! Host facade port — everything the bridge needs from the host application.
//!
//! One facade instance is created per process and injected into the
//! lifecycle manager and the capability bridge; nothing reaches for an
//! ambient global.

use async_trait::async_trait;
use luaext_domain::{Capability, CapabilityFlags, HostEvent, UserScript};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

use crate::config::settings::{ENABLE_GLOBAL_SCRIPTS, GLOBAL_SCRIPTS};

/// Errors reported by host operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("unsupported by this host: {0}")]
    Unsupported(String),
}

/// Severity of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NotifyLevel {
    pub const ALL: [NotifyLevel; 4] = [
        NotifyLevel::Success,
        NotifyLevel::Info,
        NotifyLevel::Warning,
        NotifyLevel::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Sink for user-visible notifications.
///
/// Fire-and-forget: implementations never fail.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str, title: Option<&str>);
}

/// HTTP request issued on behalf of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }
}

/// Raw HTTP response; the bridge decides what scripts may see of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Opaque handle of a host presentation element.
pub type ElementId = u64;

/// An event fired on a host element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub event: String,
    pub target: ElementId,
}

/// Callback invoked by the host when an element event fires.
pub type DomListener = Arc<dyn Fn(DomEvent) + Send + Sync>;

/// Host presentation state reachable through the DOM capability.
pub trait DocumentPort: Send + Sync {
    fn query_selector(&self, selector: &str) -> Option<ElementId>;

    fn create_element(&self, tag: &str) -> ElementId;

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<(), HostError>;

    fn set_text_content(&self, element: ElementId, text: &str) -> Result<(), HostError>;

    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), HostError>;

    fn add_event_listener(
        &self,
        element: ElementId,
        event: &str,
        listener: DomListener,
    ) -> Result<(), HostError>;
}

/// The host application as seen by the bridge.
#[async_trait]
pub trait HostFacade: Send + Sync {
    /// Read a setting from the extension's settings namespace.
    fn get_setting(&self, key: &str) -> Option<JsonValue>;

    /// Write a setting; persistence may be debounced.
    fn set_setting(&self, key: &str, value: JsonValue);

    /// Subscribe to the host event bus.
    fn subscribe_events(&self) -> broadcast::Receiver<HostEvent>;

    fn notify(&self, level: NotifyLevel, message: &str, title: Option<&str>);

    /// Durable key/value storage shared with the rest of the host.
    fn storage_get(&self, key: &str) -> Option<String>;

    fn storage_set(&self, key: &str, value: &str) -> Result<(), HostError>;

    fn storage_remove(&self, key: &str) -> Result<(), HostError>;

    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, HostError>;

    /// Presentation state, if this host has any.
    fn document(&self) -> Option<Arc<dyn DocumentPort>> {
        None
    }

    /// Persisted user scripts, in list order.
    ///
    /// A malformed list is logged and treated as empty.
    fn user_scripts(&self) -> Vec<UserScript> {
        let Some(value) = self.get_setting(GLOBAL_SCRIPTS) else {
            return Vec::new();
        };
        match serde_json::from_value(value) {
            Ok(scripts) => scripts,
            Err(e) => {
                warn!("Ignoring malformed {} setting: {}", GLOBAL_SCRIPTS, e);
                Vec::new()
            }
        }
    }

    /// Replace the persisted user-script list as a whole.
    fn set_user_scripts(&self, scripts: &[UserScript]) {
        match serde_json::to_value(scripts) {
            Ok(value) => self.set_setting(GLOBAL_SCRIPTS, value),
            Err(e) => warn!("Could not encode user scripts: {}", e),
        }
    }

    /// Current capability toggles. Missing or non-boolean values read as off.
    fn capability_flags(&self) -> CapabilityFlags {
        Capability::ALL
            .into_iter()
            .fold(CapabilityFlags::none(), |flags, capability| {
                let enabled = self
                    .get_setting(capability.setting_key())
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                flags.with(capability, enabled)
            })
    }

    /// Whether user scripts are loaded at init. Defaults to on.
    fn global_scripts_enabled(&self) -> bool {
        self.get_setting(ENABLE_GLOBAL_SCRIPTS)
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }
}
