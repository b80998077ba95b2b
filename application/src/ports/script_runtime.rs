//! Script runtime port — interface for the embedded Lua interpreter.
//!
//! This port abstracts the interpreter so that:
//! - The application layer doesn't depend on mlua
//! - Lifecycle, loading and execution can be tested with in-memory fakes
//!
//! Implementations must serialize every call into the interpreter. Calls
//! made after [`ScriptRuntime::close`] fail with [`ScriptErrorKind::Closed`].

use async_trait::async_trait;
use luaext_domain::{CapabilityFlags, ExecutionContext, HostEvent, ScriptValue};
use std::sync::Arc;

/// Broad category of a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptErrorKind {
    /// The source did not parse.
    Syntax,
    /// The source raised while running, or a value could not be marshalled.
    Runtime,
    /// The runtime could not be created or configured.
    Setup,
    /// The runtime has already been shut down.
    Closed,
}

/// Error from a script runtime operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub message: String,
}

impl ScriptError {
    pub fn new(kind: ScriptErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::Syntax, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::Runtime, message)
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::Setup, message)
    }

    pub fn closed() -> Self {
        Self::new(ScriptErrorKind::Closed, "runtime has been shut down")
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ScriptErrorKind::Syntax => write!(f, "syntax error: {}", self.message),
            ScriptErrorKind::Runtime => write!(f, "runtime error: {}", self.message),
            ScriptErrorKind::Setup => write!(f, "setup error: {}", self.message),
            ScriptErrorKind::Closed => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ScriptError {}

/// A live embedded-runtime instance.
#[async_trait]
pub trait ScriptRuntime: Send + Sync {
    /// Run `source` and register its return value as module `namespace`
    /// (`require(namespace)` afterwards yields it).
    async fn register_module(
        &self,
        namespace: &str,
        source: &str,
        chunk_name: &str,
    ) -> Result<(), ScriptError>;

    /// Run `source` once as a statement, discarding any result.
    async fn exec(&self, source: &str, chunk_name: &str) -> Result<(), ScriptError>;

    /// Run `source` with `context` injected and return its first result.
    async fn execute(
        &self,
        source: &str,
        chunk_name: &str,
        context: &ExecutionContext,
    ) -> Result<ScriptValue, ScriptError>;

    /// Forward a host event to the runtime's dispatcher symbol.
    ///
    /// A runtime without a dispatcher ignores the event.
    async fn dispatch_event(&self, event: &HostEvent) -> Result<(), ScriptError>;

    /// Flags the capability bridge of this instance was built with.
    fn capabilities(&self) -> CapabilityFlags;

    /// Release the interpreter. Idempotent.
    async fn close(&self);
}

/// Creates runtime instances with a freshly built capability bridge.
pub trait ScriptRuntimeFactory: Send + Sync {
    fn create(&self, flags: CapabilityFlags) -> Result<Arc<dyn ScriptRuntime>, ScriptError>;
}
