//! Application layer for luaext
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{ENABLE_GLOBAL_SCRIPTS, EXTENSION_NAME, GLOBAL_SCRIPTS, default_settings};
pub use ports::{
    host::{
        DocumentPort, DomEvent, DomListener, ElementId, FetchRequest, FetchResponse, HostError,
        HostFacade, NotificationSink, NotifyLevel,
    },
    resources::{ResourceError, ResourceSource},
    script_runtime::{ScriptError, ScriptErrorKind, ScriptRuntime, ScriptRuntimeFactory},
};
pub use use_cases::event_relay::EventRelay;
pub use use_cases::lifecycle::{LifecycleError, LifecyclePhase, RuntimeLifecycle};
pub use use_cases::load_modules::ModuleLoader;
pub use use_cases::run_script::{ExecutionAdapter, ExecutionError, RunInput, ScriptData};
pub use use_cases::user_scripts::{ScriptLookupError, ScriptRef, UserScriptRepository};
