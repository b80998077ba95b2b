//! Module loader use case
//!
//! Runs a [`LoadBatch`] through a [`ScriptRuntime`] in dependency order.
//! A failing unit never aborts the batch: it is recorded as skipped, and
//! every unit that (transitively) depends on it is skipped too.

use crate::ports::resources::ResourceSource;
use crate::ports::script_runtime::ScriptRuntime;
use luaext_domain::{
    LoadBatch, LoadReport, ResolveError, SkipReason, Unit, UnitOutcome, UnitSource, resolve,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ModuleLoader {
    resources: Arc<dyn ResourceSource>,
}

impl ModuleLoader {
    pub fn new(resources: Arc<dyn ResourceSource>) -> Self {
        Self { resources }
    }

    /// Load `batch` into `runtime`.
    ///
    /// Only a dependency cycle fails the whole call; in that case nothing
    /// has been run.
    pub async fn load(
        &self,
        runtime: &dyn ScriptRuntime,
        batch: &LoadBatch,
    ) -> Result<LoadReport, ResolveError> {
        let resolution = resolve(&batch.dependency_graph())?;

        for missing in &resolution.missing {
            warn!(
                "Unit {} depends on unknown unit {}; loading it anyway",
                missing.unit, missing.dependency
            );
        }

        let mut report = LoadReport::new(resolution.missing);
        let mut failed: HashSet<&str> = HashSet::new();

        for identifier in &resolution.order {
            let Some(unit) = batch.get(identifier) else {
                continue;
            };

            if let Some(dependency) = unit
                .dependencies()
                .iter()
                .find(|d| failed.contains(d.as_str()))
            {
                warn!(
                    "Skipping {}: dependency {} failed to load",
                    identifier, dependency
                );
                failed.insert(unit.identifier());
                report.record(
                    identifier.as_str(),
                    UnitOutcome::Skipped(SkipReason::DependencyFailed(dependency.clone())),
                );
                continue;
            }

            let outcome = match self.load_unit(runtime, unit).await {
                Ok(()) => {
                    debug!("Loaded {}", identifier);
                    UnitOutcome::Loaded
                }
                Err(reason) => {
                    warn!("Failed to load {}: {}", identifier, reason);
                    failed.insert(unit.identifier());
                    UnitOutcome::Skipped(reason)
                }
            };
            report.record(identifier.as_str(), outcome);
        }

        Ok(report)
    }

    async fn load_unit(&self, runtime: &dyn ScriptRuntime, unit: &Unit) -> Result<(), SkipReason> {
        let source = match unit.source() {
            UnitSource::Inline(code) => code.clone(),
            UnitSource::Resource(path) => self
                .resources
                .fetch(path)
                .await
                .map_err(|e| SkipReason::Fetch(e.to_string()))?,
        };

        let chunk_name = unit.chunk_name();
        if let Some(prelude) = unit.prelude() {
            runtime
                .exec(prelude, &chunk_name)
                .await
                .map_err(|e| SkipReason::Load(e.to_string()))?;
        }

        let result = if unit.is_module() {
            runtime
                .register_module(&unit.namespace(), &source, &chunk_name)
                .await
        } else {
            runtime.exec(&source, &chunk_name).await
        };
        result.map_err(|e| SkipReason::Load(e.to_string()))
    }
}
