//! Core library compiled into the binary.

use async_trait::async_trait;
use luaext_application::{ResourceError, ResourceSource};

const FILES: &[(&str, &str)] = &[
    ("common/string.lua", include_str!("../../lua/common/string.lua")),
    ("common/table.lua", include_str!("../../lua/common/table.lua")),
    ("common/storage.lua", include_str!("../../lua/common/storage.lua")),
    ("common/init.lua", include_str!("../../lua/common/init.lua")),
    ("init.lua", include_str!("../../lua/init.lua")),
];

/// Serves the bundled Lua sources by manifest path.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedResources;

impl EmbeddedResources {
    pub fn new() -> Self {
        Self
    }

    pub fn paths(&self) -> impl Iterator<Item = &'static str> {
        FILES.iter().map(|(path, _)| *path)
    }

    fn lookup(path: &str) -> Option<&'static str> {
        FILES
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, source)| *source)
    }
}

#[async_trait]
impl ResourceSource for EmbeddedResources {
    async fn fetch(&self, path: &str) -> Result<String, ResourceError> {
        Self::lookup(path)
            .map(str::to_string)
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }
}
