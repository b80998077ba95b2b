//! Configuration file loading for luaext
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./luaext.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/luaext/config.toml`
//! 4. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileCapabilitiesConfig, FileConfig, FileLoggingConfig,
    FileResourcesConfig, FileSettingsConfig, FileStorageConfig,
};
pub use loader::ConfigLoader;
