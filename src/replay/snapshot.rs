//! Immutable fingerprint to response mapping

use std::collections::HashMap;
use std::sync::Arc;

use crate::exchange::{Request, Response};
use crate::fingerprint::Fingerprint;

/// Point-in-time view of a cache
///
/// Never mutated once published; updates build a new snapshot with
/// [`Snapshot::with`].
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: HashMap<Fingerprint, Arc<Response>>,
}

impl Snapshot {
    /// Empty snapshot
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from recorded exchanges; later duplicates win
    #[must_use]
    pub fn from_exchanges(exchanges: impl IntoIterator<Item = (Request, Response)>) -> Self {
        let entries = exchanges
            .into_iter()
            .map(|(request, response)| (Fingerprint::new(request), Arc::new(response)))
            .collect();
        Self { entries }
    }

    /// Copy of this snapshot with one entry added or replaced
    #[must_use]
    pub fn with(&self, fingerprint: Fingerprint, response: Arc<Response>) -> Self {
        let mut entries = self.entries.clone();
        // Re-insert the key too so the persisted request is the latest one.
        entries.remove(&fingerprint);
        entries.insert(fingerprint, response);
        Self { entries }
    }

    /// Response recorded for `fingerprint`
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&Arc<Response>> {
        self.entries.get(fingerprint)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in a stable order (URI, then method) so rewrites diff cleanly
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<(&Request, &Response)> {
        let mut entries: Vec<(&Request, &Response)> = self
            .entries
            .iter()
            .map(|(fingerprint, response)| (fingerprint.request(), response.as_ref()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| {
            (a.uri.to_string(), a.method.as_str()).cmp(&(b.uri.to_string(), b.method.as_str()))
        });
        entries
    }
}
