//! Shared cache stores keyed by lookup path

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::cache::CacheStore;

/// Hands out one [`CacheStore`] per lookup path
///
/// Handlers built from the same registry with the same lookup path share a
/// store, so a response recorded by one is immediately visible to the other
/// without re-reading the file. Paths are compared after making them
/// absolute, normalizing `.` and `..`, and folding case.
#[derive(Debug, Default)]
pub struct CacheRegistry {
    stores: DashMap<String, Arc<CacheStore>>,
}

impl CacheRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the store for `lookup_path`
    ///
    /// `None` yields a fresh memory-only store that is never registered.
    pub fn get(&self, lookup_path: Option<&Path>) -> Arc<CacheStore> {
        let Some(path) = lookup_path else {
            return Arc::new(CacheStore::memory_only());
        };

        let store = self.stores.entry(canonical_key(path)).or_insert_with(|| {
            debug!("Registering cache store for {}", path.display());
            Arc::new(CacheStore::new(Some(path.to_path_buf())))
        });

        Arc::clone(store.value())
    }

    /// Forget the store for `lookup_path`, returning it
    pub fn remove(&self, lookup_path: &Path) -> Option<Arc<CacheStore>> {
        self.stores
            .remove(&canonical_key(lookup_path))
            .map(|(_, store)| store)
    }

    /// Number of registered stores
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Whether no stores are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Forget every store
    pub fn clear(&self) {
        self.stores.clear();
    }
}

/// Absolute, lexically normalized, case-folded form of `path`
fn canonical_key(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }

    normalized.to_string_lossy().to_lowercase()
}
