//! Standalone host: everything the bridge needs from a host application,
//! backed by local files, reqwest and an in-memory document.

pub mod document;
mod fetcher;
mod settings;
mod standalone;
mod storage;

pub use document::{ElementSnapshot, MemoryDocument};
pub use fetcher::ReqwestFetcher;
pub use settings::JsonSettingsStore;
pub use standalone::StandaloneHost;
pub use storage::JsonFileStorage;
