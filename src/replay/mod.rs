//! Replay cache: snapshots, shared stores and the store registry

mod cache;
mod registry;
mod snapshot;

pub use cache::{CacheStats, CacheStore};
pub use registry::CacheRegistry;
pub use snapshot::Snapshot;
