//! Core library served from a directory on disk.

use async_trait::async_trait;
use luaext_application::{ResourceError, ResourceSource};
use std::path::{Component, Path, PathBuf};

/// Reads manifest paths relative to `root`.
///
/// Paths that would escape `root` are reported as not found.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        contained.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl ResourceSource for DirectoryResources {
    async fn fetch(&self, path: &str) -> Result<String, ResourceError> {
        let full = self
            .resolve(path)
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))?;
        tokio::fs::read_to_string(&full).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(path.to_string())
            } else {
                ResourceError::Read {
                    path: path.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }
}
