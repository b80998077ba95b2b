//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod event_relay;
pub mod lifecycle;
pub mod load_modules;
pub mod run_script;
pub mod user_scripts;
