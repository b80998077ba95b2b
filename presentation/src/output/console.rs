//! Console output formatter for command results

use colored::Colorize;
use luaext_domain::{Capability, UserScript};
use serde_json::Value as JsonValue;

/// Formats command results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// One line per script: id, name and the first line of its code.
    pub fn script_list(scripts: &[UserScript]) -> String {
        if scripts.is_empty() {
            return "No scripts saved.".dimmed().to_string();
        }

        let mut output = Self::section_header("Scripts");
        for (index, script) in scripts.iter().enumerate() {
            let preview = script.code.lines().next().unwrap_or("");
            output.push_str(&format!(
                "{:>3}  {}  {}\n",
                index.to_string().yellow(),
                script.name.bold(),
                Self::truncate(preview, 48).dimmed()
            ));
        }
        output
    }

    /// Full source of one script under a header.
    pub fn script_detail(index: usize, script: &UserScript) -> String {
        format!(
            "{} {}\n{}\n{}",
            format!("[{}]", index).yellow(),
            script.name.cyan().bold(),
            "-".repeat(40),
            script.code
        )
    }

    /// Settings as `key = value` lines; unset keys show as `(unset)`.
    pub fn settings(entries: &[(String, Option<JsonValue>)]) -> String {
        let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let mut output = Self::section_header("Settings");
        for (key, value) in entries {
            let rendered = match value {
                Some(value) => Self::setting_value(value),
                None => "(unset)".dimmed().to_string(),
            };
            output.push_str(&format!("  {:<width$}  {}\n", key, rendered, width = width));
        }
        output
    }

    /// A capability toggle reminder printed after a flag changes.
    pub fn reload_hint(capability: Capability) -> String {
        format!(
            "{} {} takes effect after `luaext reload` or on the next run.",
            "note:".yellow().bold(),
            capability.as_str()
        )
    }

    fn setting_value(value: &JsonValue) -> String {
        match value {
            JsonValue::Bool(true) => "on".green().to_string(),
            JsonValue::Bool(false) => "off".red().to_string(),
            JsonValue::Array(items) => format!("[{} items]", items.len()),
            other => other.to_string(),
        }
    }

    fn section_header(title: &str) -> String {
        format!("{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn truncate(text: &str, max: usize) -> String {
        if text.chars().count() <= max {
            return text.to_string();
        }
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
