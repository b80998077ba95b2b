//! Application-level configuration.
//!
//! - [`settings`] — host setting keys and defaults owned by the extension

pub mod settings;

pub use settings::{ENABLE_GLOBAL_SCRIPTS, EXTENSION_NAME, GLOBAL_SCRIPTS, default_settings};
