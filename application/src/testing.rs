//! In-memory fakes shared by the use-case tests.

use crate::ports::host::{FetchRequest, FetchResponse, HostError, HostFacade, NotifyLevel};
use crate::ports::resources::{ResourceError, ResourceSource};
use crate::ports::script_runtime::{ScriptError, ScriptRuntime, ScriptRuntimeFactory};
use async_trait::async_trait;
use luaext_domain::{CapabilityFlags, ExecutionContext, HostEvent, ScriptValue};
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};

/// Host facade backed by in-memory maps.
pub(crate) struct MockHost {
    settings: Mutex<HashMap<String, JsonValue>>,
    storage: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<HostEvent>,
    pub(crate) notifications: Mutex<Vec<(NotifyLevel, String, Option<String>)>>,
}

impl MockHost {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            settings: Mutex::new(HashMap::new()),
            storage: Mutex::new(HashMap::new()),
            events,
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn emit(&self, event: HostEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl HostFacade for MockHost {
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
        Err(HostError::Unsupported(format!("fetch {}", request.url)))
    }
}

/// Runtime fake that records what it was asked to run.
///
/// Any source containing `error(` fails with a runtime error; `execute`
/// echoes its source and context back as a composite value.
pub(crate) struct FakeRuntime {
    flags: CapabilityFlags,
    closed: AtomicBool,
    pub(crate) log: Mutex<Vec<String>>,
    pub(crate) dispatched: Mutex<Vec<HostEvent>>,
    dispatch_notify: Notify,
}

impl FakeRuntime {
    pub(crate) fn new(flags: CapabilityFlags) -> Self {
        Self {
            flags,
            closed: AtomicBool::new(false),
            log: Mutex::new(Vec::new()),
            dispatched: Mutex::new(Vec::new()),
            dispatch_notify: Notify::new(),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Wait until at least `count` events have been dispatched.
    pub(crate) async fn wait_for_dispatches(&self, count: usize) -> Vec<HostEvent> {
        loop {
            let notified = self.dispatch_notify.notified();
            {
                let dispatched = self.dispatched.lock().unwrap();
                if dispatched.len() >= count {
                    return dispatched.clone();
                }
            }
            notified.await;
        }
    }

    fn check(&self, source: &str) -> Result<(), ScriptError> {
        if self.is_closed() {
            return Err(ScriptError::closed());
        }
        if source.contains("error(") {
            return Err(ScriptError::runtime(format!("raised by {}", source)));
        }
        Ok(())
    }
}

#[async_trait]
impl ScriptRuntime for FakeRuntime {
    async fn register_module(
        &self,
        namespace: &str,
        source: &str,
        _chunk_name: &str,
    ) -> Result<(), ScriptError> {
        self.check(source)?;
        self.log.lock().unwrap().push(format!("module:{}", namespace));
        Ok(())
    }

    async fn exec(&self, source: &str, chunk_name: &str) -> Result<(), ScriptError> {
        self.check(source)?;
        self.log.lock().unwrap().push(format!("exec:{}", chunk_name));
        Ok(())
    }

    async fn execute(
        &self,
        source: &str,
        chunk_name: &str,
        context: &ExecutionContext,
    ) -> Result<ScriptValue, ScriptError> {
        self.check(source)?;
        self.log.lock().unwrap().push(format!("execute:{}", chunk_name));
        if source == "return nil" {
            return Ok(ScriptValue::Nil);
        }
        Ok(ScriptValue::Composite(json!({
            "source": source,
            "data": context.data,
            "args": context.args,
        })))
    }

    async fn dispatch_event(&self, event: &HostEvent) -> Result<(), ScriptError> {
        if self.is_closed() {
            return Err(ScriptError::closed());
        }
        self.dispatched.lock().unwrap().push(event.clone());
        self.dispatch_notify.notify_waiters();
        Ok(())
    }

    fn capabilities(&self) -> CapabilityFlags {
        self.flags
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Factory that hands out [`FakeRuntime`]s and keeps them for inspection.
pub(crate) struct FakeFactory {
    pub(crate) created: AtomicUsize,
    pub(crate) runtimes: Mutex<Vec<Arc<FakeRuntime>>>,
    pub(crate) fail: AtomicBool,
}

impl FakeFactory {
    pub(crate) fn new() -> Self {
        Self {
            created: AtomicUsize::new(0),
            runtimes: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub(crate) fn last(&self) -> Arc<FakeRuntime> {
        self.runtimes.lock().unwrap().last().cloned().unwrap()
    }
}

impl ScriptRuntimeFactory for FakeFactory {
    fn create(&self, flags: CapabilityFlags) -> Result<Arc<dyn ScriptRuntime>, ScriptError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ScriptError::setup("factory failure"));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let runtime = Arc::new(FakeRuntime::new(flags));
        self.runtimes.lock().unwrap().push(runtime.clone());
        Ok(runtime)
    }
}

/// Resource source over a fixed map, optionally slow.
pub(crate) struct MapResources {
    files: HashMap<String, String>,
    delay: Option<Duration>,
}

impl MapResources {
    pub(crate) fn new<I, K, V>(files: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            files: files
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            delay: None,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ResourceSource for MapResources {
    async fn fetch(&self, path: &str) -> Result<String, ResourceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }
}
