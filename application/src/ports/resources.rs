//! Resource source port — where bundled unit sources are fetched from.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("failed to read resource {path}: {message}")]
    Read { path: String, message: String },
}

/// Fetches bundled resources by path relative to a base location.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<String, ResourceError>;
}
