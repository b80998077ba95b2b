//! Domain layer for luaext
//!
//! This crate contains the core entities and pure logic of the Lua bridge.
//! It has no dependencies on the Lua runtime, the host, or presentation.
//!
//! # Core Concepts
//!
//! ## Units and load batches
//!
//! A [`Unit`] is one loadable piece of Lua source with an identifier, an
//! optional namespace and a set of dependencies. A [`LoadBatch`] is the set
//! of units submitted to one load pass; [`resolve`] orders it so that every
//! unit loads after its dependencies.
//!
//! ## Capabilities
//!
//! [`CapabilityFlags`] decide which dangerous host operations (timers,
//! storage, fetch, DOM mutation) exist inside the runtime at all.

pub mod capability;
pub mod module;
pub mod scripting;

// Re-export commonly used types
pub use capability::{Capability, CapabilityFlags};
pub use module::{
    BatchError, DependencyGraph, LoadBatch, LoadReport, MissingDependency, Resolution,
    ResolveError, SkipReason, Unit, UnitOutcome, UnitSource, derive_namespace, resolve,
};
pub use scripting::{ExecutionContext, HostEvent, ScriptValue, UserScript};
