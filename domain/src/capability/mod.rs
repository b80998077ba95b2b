//! Capability flags — which dangerous host operations scripts may reach.
//!
//! The flag snapshot is read once when a runtime is built. Changing a flag
//! only takes effect after the runtime is reloaded.

use serde::{Deserialize, Serialize};

/// A flag-gated host capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// `setTimeout` / `setInterval` / `clearTimeout` / `clearInterval`
    Timers,
    /// `host_storage.get` / `host_storage.set`
    Storage,
    /// `fetch(url, options)`
    Fetch,
    /// `Document.*` element lookup and mutation
    Dom,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Timers,
        Capability::Storage,
        Capability::Fetch,
        Capability::Dom,
    ];

    /// Name used by `capabilities.has(name)` inside scripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timers => "timers",
            Self::Storage => "storage",
            Self::Fetch => "fetch",
            Self::Dom => "dom",
        }
    }

    /// Host setting key holding the toggle.
    pub fn setting_key(&self) -> &'static str {
        match self {
            Self::Timers => "enableTimers",
            Self::Storage => "enableLocalStorage",
            Self::Fetch => "enableFetch",
            Self::Dom => "enableDomManipulation",
        }
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s || c.setting_key() == s)
            .ok_or_else(|| format!("unknown capability: '{}'", s))
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the capability toggles. Everything is off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityFlags {
    pub timers: bool,
    pub storage: bool,
    pub fetch: bool,
    pub dom: bool,
}

impl CapabilityFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            timers: true,
            storage: true,
            fetch: true,
            dom: true,
        }
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        match capability {
            Capability::Timers => self.timers,
            Capability::Storage => self.storage,
            Capability::Fetch => self.fetch,
            Capability::Dom => self.dom,
        }
    }

    pub fn with(mut self, capability: Capability, enabled: bool) -> Self {
        match capability {
            Capability::Timers => self.timers = enabled,
            Capability::Storage => self.storage = enabled,
            Capability::Fetch => self.fetch = enabled,
            Capability::Dom => self.dom = enabled,
        }
        self
    }

    /// Enabled capabilities in declaration order.
    pub fn enabled(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }
}
