//! Shared cache store: single-flight population, lock-free updates and
//! debounced whole-file persistence

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::exchange::Response;
use crate::fingerprint::Fingerprint;
use crate::storage::{self, ATTRIBUTES_CONTENTS, ATTRIBUTES_FILE};
use crate::{Result, VcrError};

use super::snapshot::Snapshot;

/// Population progress; `Populating` is the lock being held
#[derive(Debug)]
enum Population {
    Unpopulated,
    Populated,
    Failed(VcrError),
}

/// Cache of recorded responses backed by an optional `.vcr` file
///
/// Readers always see a complete [`Snapshot`]. Writers publish a new snapshot
/// with a compare-and-swap retry loop, so no lock is ever held across a
/// request.
pub struct CacheStore {
    /// File the cache is populated from
    lookup_path: Option<PathBuf>,
    /// Current snapshot, `None` until populated
    snapshot: ArcSwapOption<Snapshot>,
    /// Single-flight population state
    population: Mutex<Population>,
    /// Set while a write is waiting to take its snapshot
    write_queued: AtomicBool,
    /// Serializes physical writes
    write_lock: Mutex<()>,
    /// Cache hit counter
    hits: AtomicUsize,
    /// Cache miss counter
    misses: AtomicUsize,
}

impl CacheStore {
    /// Create an unpopulated store reading from `lookup_path`
    #[must_use]
    pub fn new(lookup_path: Option<PathBuf>) -> Self {
        Self {
            lookup_path,
            snapshot: ArcSwapOption::empty(),
            population: Mutex::new(Population::Unpopulated),
            write_queued: AtomicBool::new(false),
            write_lock: Mutex::new(()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Create a store that never reads from disk
    #[must_use]
    pub fn memory_only() -> Self {
        Self::new(None)
    }

    /// File this store is populated from
    #[must_use]
    pub fn lookup_path(&self) -> Option<&Path> {
        self.lookup_path.as_deref()
    }

    /// Whether a snapshot is available for lookups
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.snapshot.load().is_some()
    }

    /// Populate the store from its lookup path, once
    ///
    /// Concurrent callers wait for the first one and share its outcome. A
    /// missing file yields an empty cache. A failure sticks until
    /// [`Self::reset`].
    ///
    /// # Errors
    ///
    /// Returns `BadCacheFile` if the file is malformed, or an I/O error if it
    /// cannot be read
    pub async fn ensure_populated(&self) -> Result<()> {
        if self.is_populated() {
            return Ok(());
        }

        let mut state = self.population.lock().await;
        match &*state {
            Population::Populated => return Ok(()),
            Population::Failed(err) => return Err(err.clone()),
            Population::Unpopulated => {}
        }

        match self.load().await {
            Ok(snapshot) => {
                self.snapshot.store(Some(Arc::new(snapshot)));
                *state = Population::Populated;
                Ok(())
            }
            Err(err) => {
                warn!("Failed to populate cache: {}", err);
                *state = Population::Failed(err.clone());
                Err(err)
            }
        }
    }

    async fn load(&self) -> Result<Snapshot> {
        let Some(path) = &self.lookup_path else {
            debug!("Memory-only cache, starting empty");
            return Ok(Snapshot::empty());
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No cache file at {}, starting empty", path.display());
                return Ok(Snapshot::empty());
            }
            Err(e) => return Err(e.into()),
        };

        let records =
            storage::read_cache_file(&mut bytes.as_slice()).map_err(|e| e.with_path(path))?;
        let snapshot = Snapshot::from_exchanges(records);

        info!(
            "Loaded cache '{}': {} responses",
            path.display(),
            snapshot.len()
        );

        Ok(snapshot)
    }

    /// Look up a recorded response
    ///
    /// # Errors
    ///
    /// Returns a configuration error if called before the store is populated
    pub fn try_lookup(&self, fingerprint: &Fingerprint) -> Result<Option<Response>> {
        let snapshot = self.snapshot.load_full().ok_or_else(not_populated)?;

        if let Some(response) = snapshot.get(fingerprint) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Ok(Some(Response::clone(response)))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            Ok(None)
        }
    }

    /// Record `response` for `fingerprint`, replacing any earlier entry
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the store is not populated
    pub fn add_or_update(&self, fingerprint: Fingerprint, response: Response) -> Result<()> {
        let response = Arc::new(response);

        loop {
            let current = self.snapshot.load_full().ok_or_else(not_populated)?;
            let candidate = Arc::new(current.with(fingerprint.clone(), Arc::clone(&response)));

            let expected = Some(current);
            let previous = self.snapshot.compare_and_swap(&expected, Some(candidate));

            match (&*previous, &expected) {
                (Some(previous), Some(expected)) if Arc::ptr_eq(previous, expected) => {
                    return Ok(());
                }
                (None, _) => return Err(not_populated()),
                _ => debug!("Snapshot changed underneath update, retrying"),
            }
        }
    }

    /// Rewrite the cache file at `update_path` from the current snapshot
    ///
    /// At most one write runs or waits per store. A call made while another
    /// write is still waiting returns immediately: that write takes its
    /// snapshot when it starts, so it already covers this caller's updates.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the parent directory of `update_path`
    /// does not exist, or an I/O error if writing fails
    pub async fn persist(self: &Arc<Self>, update_path: &Path) -> Result<()> {
        let parent = parent_dir(update_path);
        let parent_is_dir = tokio::fs::metadata(parent)
            .await
            .is_ok_and(|metadata| metadata.is_dir());
        if !parent_is_dir {
            return Err(VcrError::Configuration(format!(
                "Cache directory does not exist: {}",
                parent.display()
            )));
        }

        if self.write_queued.swap(true, Ordering::SeqCst) {
            debug!("Cache write already queued for {}", update_path.display());
            return Ok(());
        }

        // Detached: dropping this future must not tear a write or strand
        // the queued flag.
        let store = Arc::clone(self);
        let path = update_path.to_path_buf();
        tokio::spawn(async move { store.write_file(&path).await })
            .await
            .map_err(|e| VcrError::Other(format!("Cache write task failed: {e}")))?
    }

    async fn write_file(&self, path: &Path) -> Result<()> {
        let _write = self.write_lock.lock().await;

        // Cleared before the snapshot is taken: updates landing after this
        // point queue a fresh write instead of being dropped. SeqCst keeps
        // the snapshot load from moving ahead of the clear.
        self.write_queued.swap(false, Ordering::SeqCst);

        let Some(snapshot) = self.snapshot.load_full() else {
            debug!("Cache reset before write, skipping {}", path.display());
            return Ok(());
        };
        if snapshot.is_empty() {
            debug!("Nothing recorded, skipping write of {}", path.display());
            return Ok(());
        }

        let mut bytes = Vec::new();
        let count = storage::write_cache_file(&mut bytes, snapshot.sorted_entries())?;
        tokio::fs::write(path, &bytes).await?;

        write_attributes(parent_dir(path)).await?;

        info!(
            "Persisted cache '{}': {} responses, {} bytes",
            path.display(),
            count,
            bytes.len()
        );

        Ok(())
    }

    /// Drop the in-memory snapshot and any sticky failure
    ///
    /// The file on disk is left alone; the next
    /// [`Self::ensure_populated`] reads it again.
    pub async fn reset(&self) {
        let mut state = self.population.lock().await;
        self.snapshot.store(None);
        *state = Population::Unpopulated;
        debug!("Cache reset");
    }

    /// Number of cached responses, zero until populated
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.load_full().map_or(0, |s| s.len())
    }

    /// Whether no responses are cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit/miss statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            size: self.len(),
        }
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("lookup_path", &self.lookup_path)
            .field("populated", &self.is_populated())
            .field("size", &self.len())
            .finish_non_exhaustive()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Cache hits
    pub hits: usize,
    /// Cache misses
    pub misses: usize,
    /// Hit rate (0.0 to 1.0)
    pub hit_rate: f64,
    /// Cache size (number of entries)
    pub size: usize,
}

fn not_populated() -> VcrError {
    VcrError::Configuration("Cache used before it was populated".to_string())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Write the attributes marker into `dir` unless one already exists
async fn write_attributes(dir: &Path) -> Result<()> {
    let path = dir.join(ATTRIBUTES_FILE);

    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    file.write_all(ATTRIBUTES_CONTENTS.as_bytes()).await?;
    file.flush().await?;
    debug!("Wrote {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::Request;
    use crate::storage::{END_MARKER, FILE_MAGIC};
    use hyper::{StatusCode, Uri};
    use tempfile::TempDir;

    fn fingerprint(uri: &str) -> Fingerprint {
        Fingerprint::new(Request::get(uri.parse::<Uri>().unwrap()))
    }

    fn response(body: &str) -> Response {
        Response::new(StatusCode::OK).with_body(body.to_string())
    }

    #[tokio::test]
    async fn test_memory_only_starts_empty() {
        let store = CacheStore::memory_only();
        assert!(!store.is_populated());

        store.ensure_populated().await.unwrap();

        assert!(store.is_populated());
        assert!(store.is_empty());
        assert!(store.lookup_path().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_cache() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::new(Some(temp_dir.path().join("absent.vcr")));

        store.ensure_populated().await.unwrap();
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_lookup_before_population_is_an_error() {
        let store = CacheStore::memory_only();
        let err = store.try_lookup(&fingerprint("https://example/")).unwrap_err();
        assert!(err.is_configuration());

        let err = store
            .add_or_update(fingerprint("https://example/"), response("x"))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_add_then_lookup() {
        let store = CacheStore::memory_only();
        store.ensure_populated().await.unwrap();

        assert!(store.try_lookup(&fingerprint("https://example/")).unwrap().is_none());

        store
            .add_or_update(fingerprint("https://example/"), response("Mock data"))
            .unwrap();

        let hit = store.try_lookup(&fingerprint("https://example/")).unwrap().unwrap();
        assert_eq!(hit.body_bytes(), b"Mock data");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate - 0.5).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.vcr");

        let store = Arc::new(CacheStore::new(Some(path.clone())));
        store.ensure_populated().await.unwrap();
        store
            .add_or_update(fingerprint("https://example/a"), response("a"))
            .unwrap();
        store
            .add_or_update(fingerprint("https://example/b"), response("b"))
            .unwrap();
        store.persist(&path).await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(FILE_MAGIC));

        let reloaded = CacheStore::new(Some(path));
        reloaded.ensure_populated().await.unwrap();
        assert_eq!(reloaded.len(), 2);
        let hit = reloaded.try_lookup(&fingerprint("https://example/b")).unwrap().unwrap();
        assert_eq!(hit.body_bytes(), b"b");
    }

    #[tokio::test]
    async fn test_persist_requires_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("cache.vcr");

        let store = Arc::new(CacheStore::memory_only());
        store.ensure_populated().await.unwrap();
        store
            .add_or_update(fingerprint("https://example/"), response("x"))
            .unwrap();

        let err = store.persist(&path).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_persist_writes_attributes_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.vcr");
        let attributes = temp_dir.path().join(ATTRIBUTES_FILE);

        let store = Arc::new(CacheStore::memory_only());
        store.ensure_populated().await.unwrap();
        store
            .add_or_update(fingerprint("https://example/"), response("x"))
            .unwrap();

        store.persist(&path).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&attributes).unwrap(),
            ATTRIBUTES_CONTENTS
        );

        std::fs::write(&attributes, "custom\n").unwrap();
        store.persist(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&attributes).unwrap(), "custom\n");
    }

    #[tokio::test]
    async fn test_persist_empty_snapshot_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.vcr");

        let store = Arc::new(CacheStore::memory_only());
        store.ensure_populated().await.unwrap();
        store.persist(&path).await.unwrap();

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_bad_file_failure_is_sticky_until_reset() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.vcr");
        std::fs::write(&path, b"not a cache file").unwrap();

        let store = CacheStore::new(Some(path.clone()));
        assert!(store.ensure_populated().await.unwrap_err().is_bad_cache_file());

        // Fix the file; the failure sticks until reset
        let source = Arc::new(CacheStore::memory_only());
        source.ensure_populated().await.unwrap();
        source
            .add_or_update(fingerprint("https://example/"), response("x"))
            .unwrap();
        source.persist(&path).await.unwrap();

        assert!(store.ensure_populated().await.unwrap_err().is_bad_cache_file());

        store.reset().await;
        store.ensure_populated().await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_header_only_file_is_bad() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.vcr");
        let mut bytes = FILE_MAGIC.to_vec();
        bytes.extend_from_slice(END_MARKER.as_bytes());
        bytes.extend_from_slice(b"\r\n");
        std::fs::write(&path, bytes).unwrap();

        let store = CacheStore::new(Some(path));
        let err = store.ensure_populated().await.unwrap_err();
        assert!(err.to_string().contains("no cached responses found"));
    }

    #[tokio::test]
    async fn test_reset_returns_to_unpopulated() {
        let store = CacheStore::memory_only();
        store.ensure_populated().await.unwrap();
        store
            .add_or_update(fingerprint("https://example/"), response("x"))
            .unwrap();

        store.reset().await;
        assert!(!store.is_populated());
        assert!(store.try_lookup(&fingerprint("https://example/")).is_err());

        store.ensure_populated().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let store = Arc::new(CacheStore::memory_only());
        store.ensure_populated().await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..64 {
            let store = Arc::clone(&store);
            tasks.spawn(async move {
                store
                    .add_or_update(
                        fingerprint(&format!("https://example/{i}")),
                        response(&i.to_string()),
                    )
                    .unwrap();
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        assert_eq!(store.len(), 64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_persists_cover_every_update() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.vcr");

        let store = Arc::new(CacheStore::memory_only());
        store.ensure_populated().await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            let path = path.clone();
            tasks.spawn(async move {
                store
                    .add_or_update(
                        fingerprint(&format!("https://example/{i}")),
                        response(&i.to_string()),
                    )
                    .unwrap();
                store.persist(&path).await.unwrap();
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        let reloaded = CacheStore::new(Some(path));
        reloaded.ensure_populated().await.unwrap();
        assert_eq!(reloaded.len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_population_shares_failure() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.vcr");
        std::fs::write(&path, b"garbage").unwrap();

        let store = Arc::new(CacheStore::new(Some(path)));
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            tasks.spawn(async move { store.ensure_populated().await });
        }
        while let Some(result) = tasks.join_next().await {
            assert!(result.unwrap().unwrap_err().is_bad_cache_file());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_successful_population_runs_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.vcr");

        let writer = Arc::new(CacheStore::memory_only());
        writer.ensure_populated().await.unwrap();
        writer
            .add_or_update(fingerprint("https://example/a"), response("a"))
            .unwrap();
        writer.persist(&path).await.unwrap();

        let store = Arc::new(CacheStore::new(Some(path.clone())));
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            tasks.spawn(async move { store.ensure_populated().await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }
        assert_eq!(store.len(), 1);

        // A second load would fail on the garbage or drop the added entry
        std::fs::write(&path, b"garbage").unwrap();
        store
            .add_or_update(fingerprint("https://example/b"), response("b"))
            .unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            tasks.spawn(async move { store.ensure_populated().await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }
        assert_eq!(store.len(), 2);
    }
}
