//! Extension settings persisted as a JSON file.
//!
//! The file mirrors the host's settings object: one top-level key per
//! extension namespace, of which this store owns [`EXTENSION_NAME`]. Other
//! namespaces are preserved untouched. Writes are debounced; [`close`]
//! flushes whatever is pending.
//!
//! [`close`]: JsonSettingsStore::close

use luaext_application::{EXTENSION_NAME, HostError};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Default)]
struct Document {
    namespace: Map<String, JsonValue>,
    others: Map<String, JsonValue>,
}

impl Document {
    fn from_root(mut root: Map<String, JsonValue>) -> Self {
        let namespace = match root.remove(EXTENSION_NAME) {
            Some(JsonValue::Object(map)) => map,
            Some(other) => {
                warn!("Replacing non-object {} settings: {}", EXTENSION_NAME, other);
                Map::new()
            }
            None => Map::new(),
        };
        Self {
            namespace,
            others: root,
        }
    }

    fn to_root(&self) -> Map<String, JsonValue> {
        let mut root = self.others.clone();
        root.insert(
            EXTENSION_NAME.to_string(),
            JsonValue::Object(self.namespace.clone()),
        );
        root
    }
}

struct SettingsFile {
    path: PathBuf,
    document: Mutex<Document>,
}

impl SettingsFile {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Document>, HostError> {
        self.document
            .lock()
            .map_err(|e| HostError::Storage(format!("settings lock poisoned: {}", e)))
    }

    fn flush(&self) -> Result<(), HostError> {
        let text = serde_json::to_string_pretty(&self.lock()?.to_root())
            .map_err(|e| HostError::Storage(e.to_string()))?;
        let io_error = |path: &Path, e: std::io::Error| {
            HostError::Storage(format!("{}: {}", path.display(), e))
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| io_error(&self.path, e))?;
        debug!(path = %self.path.display(), "Settings flushed");
        Ok(())
    }
}

pub struct JsonSettingsStore {
    file: Arc<SettingsFile>,
    dirty: Arc<Notify>,
    cancel: CancellationToken,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl JsonSettingsStore {
    /// Open (or create) the settings file at `path`.
    ///
    /// Keys of `defaults` missing from the extension namespace are seeded.
    /// Must be called from within a tokio runtime.
    pub fn open(
        path: impl Into<PathBuf>,
        defaults: Map<String, JsonValue>,
        debounce: Duration,
    ) -> Result<Self, HostError> {
        let handle = Handle::try_current()
            .map_err(|e| HostError::Unsupported(format!("settings writer needs tokio: {}", e)))?;
        let path = path.into();
        let mut document = Document::from_root(read_root(&path)?);

        let mut seeded = false;
        for (key, value) in defaults {
            if !document.namespace.contains_key(&key) {
                document.namespace.insert(key, value);
                seeded = true;
            }
        }

        let file = Arc::new(SettingsFile {
            path,
            document: Mutex::new(document),
        });
        if seeded {
            file.flush()?;
        }

        let dirty = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let writer = handle.spawn(write_loop(
            Arc::clone(&file),
            Arc::clone(&dirty),
            cancel.clone(),
            debounce,
        ));

        Ok(Self {
            file,
            dirty,
            cancel,
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.file.lock().ok()?.namespace.get(key).cloned()
    }

    /// Update a key; the file is written once changes settle.
    pub fn set(&self, key: &str, value: JsonValue) -> Result<(), HostError> {
        self.file
            .lock()?
            .namespace
            .insert(key.to_string(), value);
        self.dirty.notify_one();
        Ok(())
    }

    /// Copy of the extension namespace.
    pub fn snapshot(&self) -> Map<String, JsonValue> {
        self.file
            .lock()
            .map(|document| document.namespace.clone())
            .unwrap_or_default()
    }

    /// Stop the writer and flush pending changes. Idempotent.
    pub async fn close(&self) {
        self.cancel.cancel();
        let writer = match self.writer.lock() {
            Ok(mut slot) => slot.take(),
            Err(e) => {
                warn!("settings writer lock poisoned: {}", e);
                None
            }
        };
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                warn!("Settings writer task failed: {}", e);
            }
        }
    }
}

impl Drop for JsonSettingsStore {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn read_root(path: &Path) -> Result<Map<String, JsonValue>, HostError> {
    match std::fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(Map::new()),
        Ok(text) => serde_json::from_str(&text)
            .map_err(|e| HostError::Storage(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
        Err(e) => Err(HostError::Storage(format!("{}: {}", path.display(), e))),
    }
}

async fn write_loop(
    file: Arc<SettingsFile>,
    dirty: Arc<Notify>,
    cancel: CancellationToken,
    debounce: Duration,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = dirty.notified() => {}
        }

        // Restart the quiet period on every further change.
        let cancelled = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break true,
                _ = dirty.notified() => continue,
                _ = tokio::time::sleep(debounce) => break false,
            }
        };

        if let Err(e) = file.flush() {
            warn!("Failed to write settings: {}", e);
        }
        if cancelled {
            return;
        }
    }

    // Cancelled while idle; a change may have arrived alongside the cancel.
    if let Err(e) = file.flush() {
        warn!("Failed to write settings: {}", e);
    }
}
