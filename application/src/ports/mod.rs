//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod host;
pub mod resources;
pub mod script_runtime;
