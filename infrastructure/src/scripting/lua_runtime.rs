//! mlua-backed implementation of the script runtime port.
//!
//! One [`LuaRuntime`] owns one sandboxed Lua 5.4 VM behind a [`CallGate`],
//! plus the registries its host functions write into (timers, event
//! listeners). [`LuaRuntimeFactory`] builds a fresh VM and capability
//! bridge for every flag snapshot it is given.

use async_trait::async_trait;
use luaext_application::{HostFacade, ScriptError, ScriptRuntime, ScriptRuntimeFactory};
use luaext_domain::{CapabilityFlags, ExecutionContext, HostEvent, ScriptValue};
use mlua::prelude::*;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::bridge::{BridgeParts, install_bridge};
use super::call_gate::CallGate;
use super::convert::{json_to_lua, json_to_lua_nil, script_error, to_script_value};
use super::event_bus::EventBus;
use super::sandbox::create_sandboxed_vm;
use super::timers_api::{SharedTimers, TimerRegistry};

/// Name of the dispatcher global that host events are forwarded to.
const DISPATCHER: &str = "dispatch_event";

pub struct LuaRuntime {
    gate: CallGate,
    timers: SharedTimers,
    event_bus: Arc<Mutex<EventBus>>,
    flags: CapabilityFlags,
}

impl LuaRuntime {
    /// Build a sandboxed VM with the capability bridge for `flags` installed.
    ///
    /// Timer and DOM-listener tasks are spawned on `handle`.
    pub fn new(
        host: Arc<dyn HostFacade>,
        flags: CapabilityFlags,
        handle: Handle,
    ) -> Result<Self, ScriptError> {
        let lua = create_sandboxed_vm()
            .map_err(|e| ScriptError::setup(format!("sandbox setup failed: {}", e)))?;

        let parts = BridgeParts {
            host,
            gate: CallGate::new(),
            timers: Arc::new(Mutex::new(TimerRegistry::new())),
            event_bus: Arc::new(Mutex::new(EventBus::new())),
            handle,
        };
        install_bridge(&lua, flags, &parts)
            .map_err(|e| ScriptError::setup(format!("bridge setup failed: {}", e)))?;
        parts.gate.open(lua)?;

        debug!(?flags, "Lua runtime created");
        Ok(Self {
            gate: parts.gate,
            timers: parts.timers,
            event_bus: parts.event_bus,
            flags,
        })
    }

    fn abort_timers(&self) {
        match self.timers.lock() {
            Ok(mut timers) => timers.abort_all(),
            Err(e) => warn!("timer registry lock poisoned: {}", e),
        }
    }
}

/// Set (or with `None`, clear) the per-call context globals.
fn set_context(lua: &Lua, context: Option<&ExecutionContext>) -> LuaResult<LuaTable> {
    let globals = lua.globals();
    let ctx = lua.create_table()?;
    let (data, args) = match context {
        Some(context) => (
            match &context.data {
                Some(data) => json_to_lua_nil(lua, data)?,
                None => LuaValue::Nil,
            },
            LuaValue::Table(lua.create_sequence_from(context.args.iter().map(String::as_str))?),
        ),
        None => (LuaValue::Nil, LuaValue::Nil),
    };
    ctx.set("data", data.clone())?;
    ctx.set("args", args.clone())?;
    globals.set("data", data)?;
    globals.set("args", args)?;
    Ok(ctx)
}

#[async_trait]
impl ScriptRuntime for LuaRuntime {
    async fn register_module(
        &self,
        namespace: &str,
        source: &str,
        chunk_name: &str,
    ) -> Result<(), ScriptError> {
        let lua = self.gate.enter().await?;
        let result: LuaResult<()> = async {
            let chunk = lua.load(source).set_name(chunk_name).into_function()?;
            let value: LuaValue = chunk.call_async(namespace).await?;
            // Same convention as `require`: a module returning nothing is `true`.
            let value = if value.is_nil() {
                LuaValue::Boolean(true)
            } else {
                value
            };
            let loaded: LuaTable = lua.globals().get::<LuaTable>("package")?.get("loaded")?;
            loaded.set(namespace, value)
        }
        .await;
        result.map_err(script_error)
    }

    async fn exec(&self, source: &str, chunk_name: &str) -> Result<(), ScriptError> {
        let lua = self.gate.enter().await?;
        lua.load(source)
            .set_name(chunk_name)
            .exec_async()
            .await
            .map_err(script_error)
    }

    async fn execute(
        &self,
        source: &str,
        chunk_name: &str,
        context: &ExecutionContext,
    ) -> Result<ScriptValue, ScriptError> {
        let lua = self.gate.enter().await?;
        let result: LuaResult<ScriptValue> = async {
            let ctx = set_context(&lua, Some(context))?;
            let chunk = lua.load(source).set_name(chunk_name).into_function()?;
            let values: LuaMultiValue = chunk.call_async(ctx).await?;
            let first = values.into_iter().next().unwrap_or(LuaValue::Nil);
            to_script_value(&lua, first)
        }
        .await;

        if let Err(e) = set_context(&lua, None) {
            warn!("Failed to clear execution context: {}", e);
        }
        result.map_err(script_error)
    }

    async fn dispatch_event(&self, event: &HostEvent) -> Result<(), ScriptError> {
        let lua = self.gate.enter().await?;
        let result: LuaResult<()> = async {
            let LuaValue::Function(dispatcher) = lua.globals().get::<LuaValue>(DISPATCHER)? else {
                return Ok(());
            };
            let name = LuaValue::String(lua.create_string(event.name())?);
            let args = std::iter::once(Ok(name))
                .chain(event.payload().iter().map(|v| json_to_lua(&lua, v)))
                .collect::<LuaResult<LuaMultiValue>>()?;
            dispatcher.call_async::<()>(args).await
        }
        .await;
        result.map_err(script_error)
    }

    fn capabilities(&self) -> CapabilityFlags {
        self.flags
    }

    async fn close(&self) {
        self.abort_timers();
        match self.event_bus.lock() {
            Ok(mut bus) => bus.clear(),
            Err(e) => warn!("event_bus lock poisoned: {}", e),
        }
        self.gate.close().await;
        debug!("Lua runtime closed");
    }
}

impl Drop for LuaRuntime {
    fn drop(&mut self) {
        self.abort_timers();
        if !self.gate.try_close() {
            warn!("Lua runtime dropped while a call was in flight");
        }
    }
}

/// Builds [`LuaRuntime`]s against one host.
pub struct LuaRuntimeFactory {
    host: Arc<dyn HostFacade>,
    handle: Handle,
}

impl LuaRuntimeFactory {
    /// Must be called from within a tokio runtime; its handle drives timers.
    pub fn new(host: Arc<dyn HostFacade>) -> Result<Self, ScriptError> {
        let handle = Handle::try_current()
            .map_err(|e| ScriptError::setup(format!("no tokio runtime available: {}", e)))?;
        Ok(Self { host, handle })
    }
}

impl ScriptRuntimeFactory for LuaRuntimeFactory {
    fn create(&self, flags: CapabilityFlags) -> Result<Arc<dyn ScriptRuntime>, ScriptError> {
        let runtime = LuaRuntime::new(Arc::clone(&self.host), flags, self.handle.clone())?;
        Ok(Arc::new(runtime))
    }
}
