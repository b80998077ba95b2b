//! Notification sink that prints to the terminal.

use chrono::Local;
use colored::Colorize;
use luaext_application::{NotificationSink, NotifyLevel};

/// Writes script notifications to stderr, keeping stdout for results.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }

    pub fn render(level: NotifyLevel, message: &str, title: Option<&str>) -> String {
        let tag = match level {
            NotifyLevel::Success => "success".green().bold(),
            NotifyLevel::Info => "info".blue().bold(),
            NotifyLevel::Warning => "warning".yellow().bold(),
            NotifyLevel::Error => "error".red().bold(),
        };
        let time = Local::now().format("%H:%M:%S").to_string();
        match title {
            Some(title) => format!("{} [{}] {}: {}", time.dimmed(), tag, title.bold(), message),
            None => format!("{} [{}] {}", time.dimmed(), tag, message),
        }
    }
}

impl NotificationSink for ConsoleNotifier {
    fn notify(&self, level: NotifyLevel, message: &str, title: Option<&str>) {
        eprintln!("{}", Self::render(level, message, title));
    }
}
