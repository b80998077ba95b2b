//! Host facade fake shared by the adapter tests.

use async_trait::async_trait;
use luaext_application::{
    DocumentPort, FetchRequest, FetchResponse, HostError, HostFacade, NotifyLevel,
};
use luaext_domain::HostEvent;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::host::MemoryDocument;

/// Records notifications and fetch requests; storage and settings are maps.
pub(crate) struct RecordingHost {
    settings: Mutex<HashMap<String, JsonValue>>,
    storage: Mutex<HashMap<String, String>>,
    notifications: Mutex<Vec<(NotifyLevel, String, Option<String>)>>,
    requests: Mutex<Vec<FetchRequest>>,
    response: Mutex<Option<FetchResponse>>,
    events: broadcast::Sender<HostEvent>,
    document: Option<Arc<MemoryDocument>>,
}

impl RecordingHost {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            settings: Mutex::new(HashMap::new()),
            storage: Mutex::new(HashMap::new()),
            notifications: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            response: Mutex::new(None),
            events,
            document: None,
        }
    }

    pub(crate) fn with_document(mut self) -> Self {
        self.document = Some(Arc::new(MemoryDocument::new()));
        self
    }

    pub(crate) fn notifications(&self) -> Vec<(NotifyLevel, String, Option<String>)> {
        self.notifications.lock().unwrap().clone()
    }

    /// Answer every following fetch with `response`.
    pub(crate) fn respond_with(&self, response: FetchResponse) {
        *self.response.lock().unwrap() = Some(response);
    }

    pub(crate) fn last_request(&self) -> Option<FetchRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HostFacade for RecordingHost {
    fn get_setting(&self, key: &str) -> Option<JsonValue> {
        self.settings.lock().unwrap().get(key).cloned()
    }

    fn set_setting(&self, key: &str, value: JsonValue) {
        self.settings.lock().unwrap().insert(key.to_string(), value);
    }

    fn subscribe_events(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    fn notify(&self, level: NotifyLevel, message: &str, title: Option<&str>) {
        self.notifications.lock().unwrap().push((
            level,
            message.to_string(),
            title.map(str::to_string),
        ));
    }

    fn storage_get(&self, key: &str) -> Option<String> {
        self.storage.lock().unwrap().get(key).cloned()
    }

    fn storage_set(&self, key: &str, value: &str) -> Result<(), HostError> {
        self.storage
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn storage_remove(&self, key: &str) -> Result<(), HostError> {
        self.storage.lock().unwrap().remove(key);
        Ok(())
    }

    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, HostError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        self.response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| HostError::Request(format!("no response configured for {}", url)))
    }

    fn document(&self) -> Option<Arc<dyn DocumentPort>> {
        self.document
            .clone()
            .map(|document| document as Arc<dyn DocumentPort>)
    }
}
