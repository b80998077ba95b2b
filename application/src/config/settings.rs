//! Host setting keys owned by the extension.
//!
//! All keys live under the [`EXTENSION_NAME`] namespace of the host's
//! settings store. Capability toggles use
//! [`Capability::setting_key`](luaext_domain::Capability::setting_key).

use luaext_domain::{Capability, CapabilityFlags};
use serde_json::{Map, Value as JsonValue, json};

/// Namespace of the extension inside the host settings.
pub const EXTENSION_NAME: &str = "Extension-Lua";

/// Ordered list of `{name, code}` user scripts.
pub const GLOBAL_SCRIPTS: &str = "globalScripts";

/// Whether user scripts are loaded at init.
pub const ENABLE_GLOBAL_SCRIPTS: &str = "enableGlobalScripts";

/// Default settings seeded into an empty namespace.
pub fn default_settings(flags: CapabilityFlags) -> Map<String, JsonValue> {
    let mut settings = Map::new();
    settings.insert(GLOBAL_SCRIPTS.to_string(), json!([]));
    settings.insert(ENABLE_GLOBAL_SCRIPTS.to_string(), json!(true));
    for capability in Capability::ALL {
        settings.insert(
            capability.setting_key().to_string(),
            json!(flags.is_enabled(capability)),
        );
    }
    settings
}
