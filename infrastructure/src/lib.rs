//! Infrastructure layer for luaext
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the mlua runtime with its capability bridge,
//! the bundled core library, a standalone file-backed host, and
//! configuration file loading.

pub mod config;
pub mod host;
pub mod resources;
pub mod scripting;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileCapabilitiesConfig, FileConfig, FileLoggingConfig,
    FileResourcesConfig, FileSettingsConfig, FileStorageConfig,
};
pub use host::{
    ElementSnapshot, JsonFileStorage, JsonSettingsStore, MemoryDocument, ReqwestFetcher,
    StandaloneHost,
};
pub use resources::{DirectoryResources, EmbeddedResources, core_manifest, resource_source};
pub use scripting::{LuaRuntime, LuaRuntimeFactory, STORAGE_PREFIX};
