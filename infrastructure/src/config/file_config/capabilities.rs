//! Capability defaults from TOML (`[capabilities]` section)
//!
//! These only seed a fresh settings file. Once the host settings exist,
//! the toggles stored there win.

use luaext_application::{ENABLE_GLOBAL_SCRIPTS, default_settings};
use luaext_domain::CapabilityFlags;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCapabilitiesConfig {
    pub timers: bool,
    pub storage: bool,
    pub fetch: bool,
    pub dom: bool,
    /// Load user scripts at init
    pub global_scripts: bool,
}

impl Default for FileCapabilitiesConfig {
    fn default() -> Self {
        Self {
            timers: false,
            storage: false,
            fetch: false,
            dom: false,
            global_scripts: true,
        }
    }
}

impl FileCapabilitiesConfig {
    pub fn flags(&self) -> CapabilityFlags {
        CapabilityFlags {
            timers: self.timers,
            storage: self.storage,
            fetch: self.fetch,
            dom: self.dom,
        }
    }

    /// Settings written into an empty extension namespace.
    pub fn seed_settings(&self) -> Map<String, JsonValue> {
        let mut settings = default_settings(self.flags());
        settings.insert(
            ENABLE_GLOBAL_SCRIPTS.to_string(),
            JsonValue::Bool(self.global_scripts),
        );
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seed_settings_reflect_config() {
        let config = FileCapabilitiesConfig {
            fetch: true,
            global_scripts: false,
            ..Default::default()
        };
        let settings = config.seed_settings();
        assert_eq!(settings.get("enableFetch"), Some(&json!(true)));
        assert_eq!(settings.get("enableTimers"), Some(&json!(false)));
        assert_eq!(settings.get("enableGlobalScripts"), Some(&json!(false)));
    }
}
