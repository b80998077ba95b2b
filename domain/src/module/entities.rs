//! Loadable units and load batches.

use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

use super::resolver::DependencyGraph;

/// Where the source text of a [`Unit`] comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitSource {
    /// A bundled resource path, relative to the resource base location
    /// (e.g. `common/string.lua`).
    Resource(String),
    /// Source code carried inline (user scripts, tests).
    Inline(String),
}

/// A loadable piece of Lua source with identity, namespace and dependencies.
///
/// Units are built once with the `with_*` builders and are immutable
/// for the rest of a load pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    identifier: String,
    source: UnitSource,
    is_module: bool,
    namespace: Option<String>,
    dependencies: BTreeSet<String>,
    prelude: Option<String>,
}

impl Unit {
    /// A unit registered under a namespace (`require`-able).
    pub fn module(identifier: impl Into<String>, source: UnitSource) -> Self {
        Self {
            identifier: identifier.into(),
            source,
            is_module: true,
            namespace: None,
            dependencies: BTreeSet::new(),
            prelude: None,
        }
    }

    /// A unit executed once as a plain statement.
    pub fn statement(identifier: impl Into<String>, source: UnitSource) -> Self {
        Self {
            is_module: false,
            ..Self::module(identifier, source)
        }
    }

    /// Bundled module whose identifier is its resource path.
    pub fn resource_module(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::module(path.clone(), UnitSource::Resource(path))
    }

    /// Bundled statement whose identifier is its resource path.
    pub fn resource_statement(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::statement(path.clone(), UnitSource::Resource(path))
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_dependency(mut self, identifier: impl Into<String>) -> Self {
        self.dependencies.insert(identifier.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(identifiers.into_iter().map(Into::into));
        self
    }

    pub fn with_prelude(mut self, code: impl Into<String>) -> Self {
        self.prelude = Some(code.into());
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn source(&self) -> &UnitSource {
        &self.source
    }

    pub fn is_module(&self) -> bool {
        self.is_module
    }

    /// Namespace the module is registered under.
    ///
    /// Falls back to [`derive_namespace`] of the identifier.
    pub fn namespace(&self) -> String {
        self.namespace
            .clone()
            .unwrap_or_else(|| derive_namespace(&self.identifier))
    }

    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn prelude(&self) -> Option<&str> {
        self.prelude.as_deref()
    }

    /// Chunk name used in runtime error messages.
    pub fn chunk_name(&self) -> String {
        format!("={}", self.identifier)
    }
}

/// Derive a module namespace from an identifier: strip any directory
/// prefix and a trailing `.lua` extension.
///
/// `common/string.lua` → `string`, `init.lua` → `init`.
pub fn derive_namespace(identifier: &str) -> String {
    let file = identifier.rsplit('/').next().unwrap_or(identifier);
    file.strip_suffix(".lua").unwrap_or(file).to_string()
}

/// Errors building a [`LoadBatch`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("duplicate unit identifier in load batch: {0}")]
    DuplicateIdentifier(String),
}

/// The full set of units submitted to one load operation.
///
/// Invariant: identifiers are unique. Submission order is preserved and
/// decides tie-breaking between independent units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBatch {
    units: Vec<Unit>,
}

impl LoadBatch {
    pub fn new(units: Vec<Unit>) -> Result<Self, BatchError> {
        let mut seen = HashSet::new();
        for unit in &units {
            if !seen.insert(unit.identifier()) {
                return Err(BatchError::DuplicateIdentifier(
                    unit.identifier().to_string(),
                ));
            }
        }
        Ok(Self { units })
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn get(&self, identifier: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.identifier() == identifier)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Dependency graph of this batch in submission order.
    pub fn dependency_graph(&self) -> DependencyGraph {
        self.units
            .iter()
            .map(|u| {
                (
                    u.identifier().to_string(),
                    u.dependencies().iter().cloned().collect::<Vec<_>>(),
                )
            })
            .collect()
    }
}
