//! Event listener registry for `events.on(name, fn)`.
//!
//! Stores Lua callbacks as `LuaRegistryKey` references, keyed by event name.
//! Listeners run in registration order through `dispatch_event`.

use mlua::prelude::*;
use std::collections::HashMap;

/// Registry of Lua callbacks organized by event name.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<String, Vec<LuaRegistryKey>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener; it runs after every listener already registered.
    pub fn register(&mut self, event_name: &str, key: LuaRegistryKey) {
        self.listeners
            .entry(event_name.to_string())
            .or_default()
            .push(key);
    }

    pub fn listeners(&self, event_name: &str) -> &[LuaRegistryKey] {
        self.listeners.get(event_name).map_or(&[], Vec::as_slice)
    }

    /// Resolve the listeners of `event_name` to callable functions.
    ///
    /// Callers release the bus before calling them, so a listener may
    /// register further listeners.
    pub fn resolve(&self, lua: &Lua, event_name: &str) -> LuaResult<Vec<LuaFunction>> {
        self.listeners(event_name)
            .iter()
            .map(|key| lua.registry_value::<LuaFunction>(key))
            .collect()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}
