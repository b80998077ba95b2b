//! Bundled core library and where its sources come from.

mod directory;
mod embedded;

pub use directory::DirectoryResources;
pub use embedded::EmbeddedResources;

use luaext_application::ResourceSource;
use luaext_domain::{BatchError, LoadBatch, Unit};
use std::path::PathBuf;
use std::sync::Arc;

/// Units of the core library, in load order.
pub fn core_manifest() -> Result<LoadBatch, BatchError> {
    LoadBatch::new(vec![
        Unit::resource_module("common/string.lua").with_namespace("Common.string"),
        Unit::resource_module("common/table.lua").with_namespace("Common.table"),
        Unit::resource_module("common/storage.lua")
            .with_namespace("localStorage")
            .with_dependency("common/table.lua"),
        Unit::resource_module("common/init.lua")
            .with_namespace("Common")
            .with_dependencies(["common/string.lua", "common/table.lua"]),
        Unit::resource_statement("init.lua"),
    ])
}

/// The configured directory, or the embedded copy when none is set.
pub fn resource_source(directory: Option<PathBuf>) -> Arc<dyn ResourceSource> {
    match directory {
        Some(dir) => Arc::new(DirectoryResources::new(dir)),
        None => Arc::new(EmbeddedResources::new()),
    }
}
