//! Per-unit outcomes of a load pass.

use std::fmt;

use super::resolver::MissingDependency;

/// Why a unit was not loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The unit's source could not be fetched.
    Fetch(String),
    /// The runtime rejected the unit (syntax or runtime error).
    Load(String),
    /// A (possibly transitive) dependency failed first.
    DependencyFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(msg) => write!(f, "fetch failed: {}", msg),
            Self::Load(msg) => write!(f, "load failed: {}", msg),
            Self::DependencyFailed(dep) => write!(f, "dependency failed: {}", dep),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Loaded,
    Skipped(SkipReason),
}

impl UnitOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}

/// Result of loading one batch, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    outcomes: Vec<(String, UnitOutcome)>,
    missing: Vec<MissingDependency>,
}

impl LoadReport {
    pub fn new(missing: Vec<MissingDependency>) -> Self {
        Self {
            outcomes: Vec::new(),
            missing,
        }
    }

    pub fn record(&mut self, identifier: impl Into<String>, outcome: UnitOutcome) {
        self.outcomes.push((identifier.into(), outcome));
    }

    pub fn outcomes(&self) -> &[(String, UnitOutcome)] {
        &self.outcomes
    }

    pub fn outcome(&self, identifier: &str) -> Option<&UnitOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, outcome)| outcome)
    }

    /// Identifiers that loaded, in load order.
    pub fn loaded(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_loaded())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn skipped(&self) -> Vec<(&str, &SkipReason)> {
        self.outcomes
            .iter()
            .filter_map(|(id, o)| match o {
                UnitOutcome::Skipped(reason) => Some((id.as_str(), reason)),
                UnitOutcome::Loaded => None,
            })
            .collect()
    }

    /// Dependency references to units absent from the batch.
    pub fn missing(&self) -> &[MissingDependency] {
        &self.missing
    }
}
