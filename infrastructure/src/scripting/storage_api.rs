//! `host_storage` global (`enableLocalStorage`).
//!
//! Values are JSON-encoded into the host's durable key/value storage under
//! a fixed key prefix, so scripts cannot read or clobber other host keys.
//!
//! ```lua
//! host_storage.set("count", { n = 1 })   -- true on success
//! host_storage.get("count").n            -- 1
//! host_storage.set("count", nil)         -- deletes
//! ```

use luaext_application::HostFacade;
use mlua::prelude::*;
use std::sync::Arc;
use tracing::warn;

use super::convert::{json_to_lua, lua_to_json};

/// Prefix of every storage key written by scripts.
pub const STORAGE_PREFIX: &str = "ST-Ext-LUA::";

pub fn storage_key(key: &str) -> String {
    format!("{}{}", STORAGE_PREFIX, key)
}

pub fn register_storage_api(
    lua: &Lua,
    globals: &LuaTable,
    host: Arc<dyn HostFacade>,
) -> LuaResult<()> {
    let storage = lua.create_table()?;

    // host_storage.get(key) -> value | nil
    {
        let host = Arc::clone(&host);
        let get_fn = lua.create_function(move |lua, key: String| {
            let Some(raw) = host.storage_get(&storage_key(&key)) else {
                return Ok(LuaValue::Nil);
            };
            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(json) => json_to_lua(lua, &json),
                Err(e) => {
                    warn!(key = %key, "Discarding undecodable storage value: {}", e);
                    Ok(LuaValue::Nil)
                }
            }
        })?;
        storage.set("get", get_fn)?;
    }

    // host_storage.set(key, value | nil) -> boolean
    {
        let host = Arc::clone(&host);
        let set_fn = lua.create_function(move |lua, (key, value): (String, LuaValue)| {
            let full_key = storage_key(&key);
            let is_null = matches!(&value, LuaValue::LightUserData(ud) if ud.0.is_null());
            if value.is_nil() || is_null {
                return Ok(match host.storage_remove(&full_key) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(key = %key, "Failed to remove storage value: {}", e);
                        false
                    }
                });
            }

            let encoded = lua_to_json(lua, value)
                .map_err(|e| e.to_string())
                .and_then(|json| serde_json::to_string(&json).map_err(|e| e.to_string()));
            let stored = encoded.and_then(|text| {
                host.storage_set(&full_key, &text)
                    .map_err(|e| e.to_string())
            });
            Ok(match stored {
                Ok(()) => true,
                Err(e) => {
                    warn!(key = %key, "Failed to store value: {}", e);
                    false
                }
            })
        })?;
        storage.set("set", set_fn)?;
    }

    globals.set("host_storage", storage)
}
