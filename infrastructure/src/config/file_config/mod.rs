//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod capabilities;
mod storage;

pub use capabilities::FileCapabilitiesConfig;
pub use storage::{FileSettingsConfig, FileStorageConfig};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("resources.directory does not exist: {0}")]
    MissingResourceDirectory(PathBuf),

    #[error("storage.settings_file and storage.storage_file must differ: {0}")]
    SharedStorageFile(PathBuf),
}

/// Raw resources configuration from TOML (`[resources]` section)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResourcesConfig {
    /// Serve the core library from this directory instead of the embedded copy
    pub directory: Option<PathBuf>,
}

/// Raw logging configuration from TOML (`[logging]` section)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Daily-rolling log files are written here when set
    pub directory: Option<PathBuf>,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub capabilities: FileCapabilitiesConfig,
    pub resources: FileResourcesConfig,
    pub storage: FileStorageConfig,
    pub settings: FileSettingsConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the configuration, returning every issue found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if let Some(dir) = &self.resources.directory {
            if !dir.is_dir() {
                issues.push(ConfigValidationError::MissingResourceDirectory(dir.clone()));
            }
        }

        let settings = self.storage.settings_path();
        if settings == self.storage.storage_path() {
            issues.push(ConfigValidationError::SharedStorageFile(settings));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FileConfig::default().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let shared = PathBuf::from("/tmp/luaext-shared.json");
        let config = FileConfig {
            resources: FileResourcesConfig {
                directory: Some(PathBuf::from("/definitely/not/here")),
            },
            storage: FileStorageConfig {
                settings_file: Some(shared.clone()),
                storage_file: Some(shared.clone()),
            },
            ..Default::default()
        };

        assert_eq!(
            config.validate(),
            vec![
                ConfigValidationError::MissingResourceDirectory(PathBuf::from(
                    "/definitely/not/here"
                )),
                ConfigValidationError::SharedStorageFile(shared),
            ]
        );
    }
}
