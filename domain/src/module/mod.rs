//! Module units, load batches and dependency resolution.

pub mod entities;
pub mod outcome;
pub mod resolver;

pub use entities::{BatchError, LoadBatch, Unit, UnitSource, derive_namespace};
pub use outcome::{LoadReport, SkipReason, UnitOutcome};
pub use resolver::{DependencyGraph, MissingDependency, Resolution, ResolveError, resolve};
