//! Host facade for running the bridge outside of a host application.
//!
//! Settings and storage live in JSON files, events travel over a tokio
//! broadcast channel, notifications go to a pluggable sink and the DOM
//! capability works against an in-memory document.

use async_trait::async_trait;
use luaext_application::{
    DocumentPort, FetchRequest, FetchResponse, HostError, HostFacade, NotificationSink,
    NotifyLevel,
};
use luaext_domain::HostEvent;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

use super::document::MemoryDocument;
use super::fetcher::ReqwestFetcher;
use super::settings::JsonSettingsStore;
use super::storage::JsonFileStorage;

/// Events buffered per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

pub struct StandaloneHost {
    settings: JsonSettingsStore,
    storage: JsonFileStorage,
    fetcher: ReqwestFetcher,
    notifier: Arc<dyn NotificationSink>,
    events: broadcast::Sender<HostEvent>,
    document: Arc<MemoryDocument>,
}

impl StandaloneHost {
    pub fn new(
        settings: JsonSettingsStore,
        storage: JsonFileStorage,
        fetcher: ReqwestFetcher,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings,
            storage,
            fetcher,
            notifier,
            events,
            document: Arc::new(MemoryDocument::new()),
        }
    }

    /// Publish an event to every subscriber. Returns how many received it.
    pub fn emit(&self, event: HostEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    pub fn settings(&self) -> &JsonSettingsStore {
        &self.settings
    }

    pub fn storage(&self) -> &JsonFileStorage {
        &self.storage
    }

    pub fn memory_document(&self) -> &Arc<MemoryDocument> {
        &self.document
    }

    /// Flush pending settings. Call before exiting.
    pub async fn close(&self) {
        self.settings.close().await;
    }
}

#[async_trait]
impl HostFacade for StandaloneHost {
    fn get_setting(&self, key: &str) -> Option<JsonValue> {
        self.settings.get(key)
    }

    fn set_setting(&self, key: &str, value: JsonValue) {
        if let Err(e) = self.settings.set(key, value) {
            warn!(key, "Failed to update setting: {}", e);
        }
    }

    fn subscribe_events(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    fn notify(&self, level: NotifyLevel, message: &str, title: Option<&str>) {
        self.notifier.notify(level, message, title);
    }

    fn storage_get(&self, key: &str) -> Option<String> {
        self.storage.get(key)
    }

    fn storage_set(&self, key: &str, value: &str) -> Result<(), HostError> {
        self.storage.set(key, value)
    }

    fn storage_remove(&self, key: &str) -> Result<(), HostError> {
        self.storage.remove(key)
    }

    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, HostError> {
        self.fetcher.fetch(request).await
    }

    fn document(&self) -> Option<Arc<dyn DocumentPort>> {
        Some(self.document.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luaext_application::GLOBAL_SCRIPTS;
    use luaext_domain::UserScript;
    use serde_json::{Map, json};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CollectingSink(Mutex<Vec<String>>);

    impl NotificationSink for CollectingSink {
        fn notify(&self, level: NotifyLevel, message: &str, _title: Option<&str>) {
            self.0
                .lock()
                .unwrap()
                .push(format!("{}:{}", level.as_str(), message));
        }
    }

    fn host(dir: &std::path::Path, sink: Arc<CollectingSink>) -> StandaloneHost {
        let settings = JsonSettingsStore::open(
            dir.join("settings.json"),
            Map::new(),
            Duration::from_millis(10),
        )
        .unwrap();
        let storage = JsonFileStorage::open(dir.join("storage.json")).unwrap();
        StandaloneHost::new(settings, storage, ReqwestFetcher::new().unwrap(), sink)
    }

    #[tokio::test]
    async fn test_facade_routes_to_backends() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(CollectingSink::default());
        let host = host(dir.path(), sink.clone());

        host.set_user_scripts(&[UserScript::new("a", "return 1")]);
        assert_eq!(host.user_scripts().len(), 1);
        assert_eq!(host.settings().get(GLOBAL_SCRIPTS).unwrap()[0]["name"], json!("a"));

        host.storage_set("k", "v").unwrap();
        assert_eq!(host.storage().get("k").as_deref(), Some("v"));

        host.notify(NotifyLevel::Warning, "careful", None);
        assert_eq!(*sink.0.lock().unwrap(), vec!["warning:careful".to_string()]);

        assert!(host.document().is_some());
        host.close().await;
    }

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let host = host(dir.path(), Arc::new(CollectingSink::default()));

        assert_eq!(host.emit(HostEvent::new("nobody")), 0);

        let mut rx = host.subscribe_events();
        assert_eq!(host.emit(HostEvent::new("chat_changed").with_arg(json!(1))), 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "chat_changed");
        assert_eq!(event.payload(), &[json!(1)]);
        host.close().await;
    }
}
