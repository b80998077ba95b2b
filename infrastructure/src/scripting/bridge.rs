//! Capability bridge — installs host functions into a fresh VM.
//!
//! Core globals are always present. Gated globals exist only when their
//! flag is on at build time; a disabled capability leaves the symbol `nil`.

use luaext_application::HostFacade;
use luaext_domain::{Capability, CapabilityFlags};
use mlua::prelude::*;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::call_gate::CallGate;
use super::core_api::register_core_api;
use super::dom_api::register_dom_api;
use super::event_bus::EventBus;
use super::fetch_api::register_fetch_api;
use super::storage_api::register_storage_api;
use super::timers_api::{SharedTimers, register_timers_api};

/// Shared state the installed host functions close over.
pub struct BridgeParts {
    pub host: Arc<dyn HostFacade>,
    pub gate: CallGate,
    pub timers: SharedTimers,
    pub event_bus: Arc<Mutex<EventBus>>,
    pub handle: Handle,
}

pub fn install_bridge(lua: &Lua, flags: CapabilityFlags, parts: &BridgeParts) -> LuaResult<()> {
    let globals = lua.globals();

    register_core_api(
        lua,
        &globals,
        Arc::clone(&parts.host),
        flags,
        Arc::clone(&parts.event_bus),
    )?;

    if flags.is_enabled(Capability::Timers) {
        register_timers_api(
            lua,
            &globals,
            parts.gate.clone(),
            Arc::clone(&parts.timers),
            parts.handle.clone(),
        )?;
    }

    if flags.is_enabled(Capability::Storage) {
        register_storage_api(lua, &globals, Arc::clone(&parts.host))?;
    }

    if flags.is_enabled(Capability::Dom) {
        match parts.host.document() {
            Some(document) => register_dom_api(
                lua,
                &globals,
                document,
                parts.gate.clone(),
                parts.handle.clone(),
            )?,
            None => {
                warn!("DOM capability enabled but the host has no document; Document stays nil")
            }
        }
    }

    if flags.is_enabled(Capability::Fetch) {
        register_fetch_api(lua, &globals, Arc::clone(&parts.host))?;
    }

    debug!(?flags, "Capability bridge installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::timers_api::TimerRegistry;
    use crate::testing::RecordingHost;

    fn install(flags: CapabilityFlags, host: Arc<RecordingHost>) -> Lua {
        let lua = Lua::new();
        let parts = BridgeParts {
            host,
            gate: CallGate::new(),
            timers: Arc::new(Mutex::new(TimerRegistry::new())),
            event_bus: Arc::new(Mutex::new(EventBus::new())),
            handle: Handle::current(),
        };
        install_bridge(&lua, flags, &parts).unwrap();
        lua
    }

    fn present(lua: &Lua, name: &str) -> bool {
        !lua.globals().get::<LuaValue>(name).unwrap().is_nil()
    }

    #[tokio::test]
    async fn test_disabled_capabilities_are_nil() {
        let lua = install(CapabilityFlags::none(), Arc::new(RecordingHost::new()));
        let always = [
            "hosttype",
            "regex",
            "JSON",
            "notify",
            "capabilities",
            "events",
            "dispatch_event",
        ];
        for name in always {
            assert!(present(&lua, name), "{} should always be installed", name);
        }
        let gated = [
            "setTimeout",
            "setInterval",
            "clearTimeout",
            "host_storage",
            "fetch",
            "Document",
        ];
        for name in gated {
            assert!(!present(&lua, name), "{} should be absent", name);
        }
    }

    #[tokio::test]
    async fn test_enabled_capabilities_are_installed() {
        let host = Arc::new(RecordingHost::new().with_document());
        let lua = install(CapabilityFlags::all(), host);
        for name in ["setTimeout", "clearInterval", "host_storage", "fetch", "Document"] {
            assert!(present(&lua, name), "{} should be installed", name);
        }
    }

    #[tokio::test]
    async fn test_dom_without_document_stays_nil() {
        let flags = CapabilityFlags::none().with(Capability::Dom, true);
        let lua = install(flags, Arc::new(RecordingHost::new()));
        assert!(!present(&lua, "Document"));
    }
}
