//! Presentation layer for luaext
//!
//! This crate contains CLI definitions, the command surface that maps
//! commands onto use cases, and console output.

pub mod cli;
pub mod output;
pub mod surface;

// Re-export commonly used types
pub use cli::commands::{
    Cli, Command, InputArgs, ScriptSelector, ScriptsCommand, SettingsCommand,
};
pub use output::console::ConsoleFormatter;
pub use output::notifier::ConsoleNotifier;
pub use surface::{CommandError, CommandSurface, EventEmitter, parse_loose};
