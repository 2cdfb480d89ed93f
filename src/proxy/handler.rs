//! Replaying request handler

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::SettingsProvider;
use crate::exchange::{Request, Response};
use crate::fingerprint::Fingerprint;
use crate::network::Transport;
use crate::replay::{CacheRegistry, CacheStore};
use crate::{Result, VcrError};

use super::Behaviors;

/// Serves requests from a cache, falling back to a transport and recording
/// what it returns
pub struct ReplayHandler<T> {
    transport: T,
    store: Arc<CacheStore>,
    update_path: Option<PathBuf>,
    behaviors: Behaviors,
}

impl<T: Transport> ReplayHandler<T> {
    /// Create a handler over an existing store
    ///
    /// Without an `update_path` nothing is recorded.
    #[must_use]
    pub fn new(
        transport: T,
        store: Arc<CacheStore>,
        update_path: Option<PathBuf>,
        behaviors: Behaviors,
    ) -> Self {
        Self {
            transport,
            store,
            update_path,
            behaviors,
        }
    }

    /// Create a handler whose store comes from `registry`
    ///
    /// Handlers built this way with the same lookup path share one store.
    #[must_use]
    pub fn from_settings(
        transport: T,
        registry: &CacheRegistry,
        settings: &impl SettingsProvider,
        behaviors: Behaviors,
    ) -> Self {
        let lookup_path = settings.lookup_path();
        let store = registry.get(lookup_path.as_deref());
        Self::new(transport, store, settings.update_path(), behaviors)
    }

    /// The store backing this handler
    #[must_use]
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Where recorded responses are persisted
    #[must_use]
    pub fn update_path(&self) -> Option<&Path> {
        self.update_path.as_deref()
    }

    /// Active behaviors
    #[must_use]
    pub fn behaviors(&self) -> Behaviors {
        self.behaviors
    }

    /// Handle a request
    ///
    /// # Errors
    ///
    /// - `BadCacheFile` if the cache file cannot be parsed
    /// - `NoCacheEntry` on a miss while network calls are denied
    /// - `Transport` if forwarding fails; nothing is recorded
    /// - `Configuration` or `Io` if the recorded response cannot be
    ///   persisted, even though the network call succeeded
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.store.ensure_populated().await?;

        let fingerprint = Fingerprint::new(request);
        let request = fingerprint.request();

        if !self.behaviors.skip_cache_lookup {
            if let Some(response) = self.store.try_lookup(&fingerprint)? {
                debug!(
                    "Cache hit: {} {} -> {} ({})",
                    request.method,
                    request.uri,
                    response.status,
                    fingerprint.short_id()
                );
                return Ok(response);
            }
            debug!(
                "Cache miss: {} {} ({})",
                request.method,
                request.uri,
                fingerprint.short_id()
            );
        }

        if self.behaviors.deny_network_calls {
            warn!(
                "No cached response for {} {} and network calls are denied",
                request.method, request.uri
            );
            return Err(VcrError::NoCacheEntry {
                method: request.method.to_string(),
                uri: request.uri.to_string(),
            });
        }

        let response = self.transport.send(request).await.map_err(VcrError::from)?;

        if self.behaviors.skip_recording_responses {
            return Ok(response);
        }
        let Some(update_path) = &self.update_path else {
            debug!("No update path configured, not recording");
            return Ok(response);
        };

        info!(
            "Recording {} {} -> {} ({})",
            request.method,
            request.uri,
            response.status,
            fingerprint.short_id()
        );

        self.store.add_or_update(fingerprint.clone(), response.clone())?;
        self.store.persist(update_path).await?;

        Ok(response)
    }
}

impl<T> std::fmt::Debug for ReplayHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayHandler")
            .field("store", &self.store)
            .field("update_path", &self.update_path)
            .field("behaviors", &self.behaviors)
            .finish_non_exhaustive()
    }
}
