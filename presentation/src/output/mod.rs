//! Console output: formatting of command results and user notifications.

pub mod console;
pub mod notifier;
