//! Call gate — the single entry point into a Lua VM.
//!
//! Every call into Lua (executions, event dispatch, timer and DOM-listener
//! callbacks) first enters the gate, so at most one Lua call runs at a
//! time. Closing the gate drops the VM, which also breaks the reference
//! cycle between the VM and host closures that hold a gate clone.

use luaext_application::ScriptError;
use mlua::prelude::*;
use std::sync::Arc;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

#[derive(Clone, Default)]
pub struct CallGate {
    lua: Arc<Mutex<Option<Lua>>>,
}

impl CallGate {
    /// A gate with no VM behind it yet; entering fails until [`open`](Self::open).
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the VM. Only valid while nothing else holds the gate.
    pub fn open(&self, lua: Lua) -> Result<(), ScriptError> {
        let mut slot = self
            .lua
            .try_lock()
            .map_err(|e| ScriptError::setup(format!("call gate busy: {}", e)))?;
        *slot = Some(lua);
        Ok(())
    }

    /// Wait for exclusive access to the VM.
    pub async fn enter(&self) -> Result<MappedMutexGuard<'_, Lua>, ScriptError> {
        MutexGuard::try_map(self.lua.lock().await, Option::as_mut)
            .map_err(|_| ScriptError::closed())
    }

    /// Drop the VM once in-flight calls have finished. Idempotent.
    pub async fn close(&self) {
        self.lua.lock().await.take();
    }

    /// Drop the VM if the gate is free right now.
    pub fn try_close(&self) -> bool {
        match self.lua.try_lock() {
            Ok(mut slot) => {
                slot.take();
                true
            }
            Err(_) => false,
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.lua.lock().await.is_none()
    }
}
