//! Lua scripting platform
//!
//! Provides [`LuaRuntime`], the mlua (Lua 5.4) implementation of the
//! `ScriptRuntime` port, and the capability bridge it is built with.
//!
//! # Modules
//!
//! - `sandbox` — VM construction without host I/O or C modules
//! - `call_gate` — async mutex serializing every entry into the VM
//! - `bridge` — installs core and flag-gated host functions
//! - `core_api` — `hosttype`, `regex`, `JSON`, `notify`, `capabilities`, `events`
//! - `timers_api` — `setTimeout` / `setInterval` and their `clear*` pair
//! - `storage_api` — `host_storage.get/set`
//! - `dom_api` — `Document.*`
//! - `fetch_api` — `fetch(url, options)`
//! - `lua_runtime` — runtime + factory tying everything together

mod bridge;
mod call_gate;
mod convert;
mod core_api;
mod dom_api;
mod event_bus;
mod fetch_api;
mod lua_runtime;
mod sandbox;
mod storage_api;
mod timers_api;

pub use call_gate::CallGate;
pub use dom_api::{ElementHandle, create_style, sanitize};
pub use lua_runtime::{LuaRuntime, LuaRuntimeFactory};
pub use storage_api::STORAGE_PREFIX;
