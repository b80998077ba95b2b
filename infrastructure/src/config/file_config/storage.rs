//! Storage locations from TOML (`[storage]` and `[settings]` sections)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "luaext";

/// Raw storage configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Extension settings (`globalScripts`, capability toggles)
    pub settings_file: Option<PathBuf>,
    /// Key/value store behind `host_storage`
    pub storage_file: Option<PathBuf>,
}

impl FileStorageConfig {
    fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings_file
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("settings.json"))
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage_file
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("storage.json"))
    }
}

/// Raw settings persistence configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettingsConfig {
    /// Quiet period before a settings change is written to disk
    pub debounce_ms: u64,
}

impl Default for FileSettingsConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl FileSettingsConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_live_under_data_dir() {
        let config = FileStorageConfig::default();
        assert!(config.settings_path().ends_with("luaext/settings.json"));
        assert!(config.storage_path().ends_with("luaext/storage.json"));
    }

    #[test]
    fn test_explicit_paths_win() {
        let config = FileStorageConfig {
            settings_file: Some(PathBuf::from("/tmp/s.json")),
            storage_file: None,
        };
        assert_eq!(config.settings_path(), PathBuf::from("/tmp/s.json"));
    }
}
