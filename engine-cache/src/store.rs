//! `ArtifactCache` — the bounded LRU described in spec §4.B.
//!
//! A manual `lru::LruCache` guarded by `parking_lot::Mutex` gives exact
//! dual-bound eviction (bytes *and* entry count, spec §8 invariant)
//! that a single off-the-shelf weighted cache can't express directly.
//! Single-flight coalescing is a `dashmap` of `OnceLock` placeholders:
//! concurrent callers for the same key share one load, the same idiom
//! the teacher uses for its parse cache's "compute once" semantics,
//! generalised from Moka's built-in `get_with` to a fallible load.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use dashmap::DashMap;
use engine_fs::FileService;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::entry::{CacheEntry, CacheKey, CacheValue, Namespace, VersionMarker};
use crate::errors::CacheResult;
use crate::stats::{CacheStats, CacheStatsSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_bytes: u64,
    pub max_entries: u64,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: 256 * 1024 * 1024,
            max_entries: 10_000,
            ttl: Duration::from_secs(15 * 60),
        }
    }
}

type InFlight = Arc<OnceLock<Result<Arc<CacheEntry>, String>>>;

pub struct ArtifactCache {
    config: CacheConfig,
    inner: Mutex<lru::LruCache<CacheKey, Arc<CacheEntry>>>,
    total_bytes: Mutex<u64>,
    in_flight: DashMap<CacheKey, InFlight>,
    stats: CacheStats,
}

impl ArtifactCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries.max(1) as usize)
            .unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            config,
            inner: Mutex::new(lru::LruCache::new(capacity)),
            total_bytes: Mutex::new(0),
            in_flight: DashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        let inner = self.inner.lock();
        CacheStatsSnapshot {
            hits: self.stats.hits(),
            misses: self.stats.misses(),
            evictions: self.stats.evictions(),
            bytes: *self.total_bytes.lock(),
            entries: inner.len() as u64,
        }
    }

    /// Serve `path`'s file bytes from cache if present and fresh;
    /// otherwise load via `fs`, store, and return. Concurrent callers
    /// for the same path share one load (spec §4.B, §8 coalescing
    /// invariant).
    #[instrument(skip(self, fs))]
    pub fn get_file(&self, fs: &FileService, path: &Path) -> CacheResult<Arc<Vec<u8>>> {
        let entry = self.get_or_load(CacheKey::file(path), fs, path, || {
            let bytes = fs.read(path)?;
            Ok(CacheValue::FileArtifact(Arc::new(bytes)))
        })?;
        Ok(entry.value.as_file_artifact().cloned().unwrap_or_default())
    }

    /// Serve a pre-parsed AST document from cache, or compute it with
    /// `loader` and store it under the AST namespace (spec §4.C).
    #[instrument(skip(self, fs, loader))]
    pub fn get_ast(
        &self,
        fs: &FileService,
        path: &Path,
        loader: impl FnOnce() -> CacheResult<serde_json::Value>,
    ) -> CacheResult<Arc<serde_json::Value>> {
        let entry = self.get_or_load(CacheKey::ast(path), fs, path, || {
            Ok(CacheValue::ParsedAst(Arc::new(loader()?)))
        })?;
        Ok(entry.value.as_parsed_ast().cloned().unwrap())
    }

    /// Serve an analyze result keyed by `(abs_path, op fingerprint)`
    /// (spec §4.F): a different fingerprint for the same path is a
    /// distinct cache slot, but freshness still tracks the file's own
    /// version marker.
    #[instrument(skip(self, fs, loader))]
    pub fn get_analysis(
        &self,
        fs: &FileService,
        path: &Path,
        fingerprint: &str,
        loader: impl FnOnce() -> CacheResult<serde_json::Value>,
    ) -> CacheResult<Arc<serde_json::Value>> {
        let entry = self.get_or_load(CacheKey::analysis(path, fingerprint), fs, path, || {
            Ok(CacheValue::AnalysisResult(Arc::new(loader()?)))
        })?;
        Ok(entry.value.as_analysis_result().cloned().unwrap())
    }

    fn get_or_load(
        &self,
        key: CacheKey,
        fs: &FileService,
        path: &Path,
        load: impl FnOnce() -> CacheResult<CacheValue>,
    ) -> CacheResult<Arc<CacheEntry>> {
        let current_version = VersionMarker::from_stat(&fs.stat(path)?);

        if let Some(entry) = self.fresh_hit(&key, current_version) {
            self.stats.record_hit();
            return Ok(entry);
        }

        self.stats.record_miss();
        self.load_coalesced(key, current_version, load)
    }

    fn fresh_hit(&self, key: &CacheKey, current_version: VersionMarker) -> Option<Arc<CacheEntry>> {
        let mut inner = self.inner.lock();
        let entry = inner.get(key)?.clone();
        if entry.version != current_version || entry.is_expired(self.config.ttl) {
            if let Some(evicted) = inner.pop(key) {
                let mut total = self.total_bytes.lock();
                *total = total.saturating_sub(evicted.size_bytes);
                self.stats.record_eviction();
            }
            return None;
        }
        Some(entry)
    }

    fn load_coalesced(
        &self,
        key: CacheKey,
        version: VersionMarker,
        load: impl FnOnce() -> CacheResult<CacheValue>,
    ) -> CacheResult<Arc<CacheEntry>> {
        let cell = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone();

        let result = cell
            .get_or_init(|| load().map(|v| Arc::new(CacheEntry::new(v, version))).map_err(|e| e.to_string()))
            .clone();

        // Only the thread that actually ran `get_or_init`'s closure
        // needs to clean the placeholder up; a racing remove is
        // harmless since the cell is already resolved either way.
        self.in_flight.remove_if(&key, |_, v| Arc::ptr_eq(v, &cell));

        let entry = result.map_err(|message| {
            crate::errors::CacheError::Fs(engine_fs::FsError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                message,
            )))
        })?;

        self.insert(key, entry.clone());
        Ok(entry)
    }

    fn insert(&self, key: CacheKey, entry: Arc<CacheEntry>) {
        let mut inner = self.inner.lock();
        let mut total = self.total_bytes.lock();

        if let Some(old) = inner.put(key, entry.clone()) {
            *total = total.saturating_sub(old.size_bytes);
        }
        *total += entry.size_bytes;

        while *total > self.config.max_bytes {
            match inner.pop_lru() {
                Some((_, evicted)) => {
                    *total = total.saturating_sub(evicted.size_bytes);
                    self.stats.record_eviction();
                }
                None => break,
            }
        }
    }

    pub fn invalidate(&self, namespace: Namespace, path: &Path) {
        let key = CacheKey { namespace, path: path.to_path_buf(), discriminator: None };
        let mut inner = self.inner.lock();
        if let Some(evicted) = inner.pop(&key) {
            let mut total = self.total_bytes.lock();
            *total = total.saturating_sub(evicted.size_bytes);
            self.stats.record_eviction();
        }
    }

    pub fn invalidate_all_namespaces(&self, path: &Path) {
        self.invalidate(Namespace::File, path);
        self.invalidate(Namespace::Ast, path);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.clear();
        *self.total_bytes.lock() = 0;
    }

    /// Snapshot of entries, for tests and diagnostics only.
    pub fn entry_count(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn total_bytes(&self) -> u64 {
        *self.total_bytes.lock()
    }
}

/// Trivial string->count bookkeeping used by a couple of tests to
/// assert how many times a closure actually ran under coalescing.
#[derive(Default)]
pub struct CallCounter(Mutex<HashMap<String, u64>>);

impl CallCounter {
    pub fn bump(&self, key: &str) -> u64 {
        let mut map = self.0.lock();
        let count = map.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_fs::{FileServiceConfig, SecurityPolicy};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Barrier;
    use tempfile::TempDir;

    fn fs(dir: &TempDir) -> FileService {
        FileService::new(dir.path(), FileServiceConfig::default(), SecurityPolicy::default()).unwrap()
    }

    #[test]
    fn get_file_caches_and_serves_hit() {
        let dir = TempDir::new().unwrap();
        let service = fs(&dir);
        service.write("a.txt", b"hello").unwrap();

        let cache = ArtifactCache::new(CacheConfig::default());
        let first = cache.get_file(&service, Path::new("a.txt")).unwrap();
        assert_eq!(*first, b"hello".to_vec());
        assert_eq!(cache.stats().misses, 1);

        let second = cache.get_file(&service, Path::new("a.txt")).unwrap();
        assert_eq!(*second, b"hello".to_vec());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn stale_version_marker_triggers_reload() {
        let dir = TempDir::new().unwrap();
        let service = fs(&dir);
        service.write("a.txt", b"v1").unwrap();

        let cache = ArtifactCache::new(CacheConfig::default());
        assert_eq!(*cache.get_file(&service, Path::new("a.txt")).unwrap(), b"v1".to_vec());

        std::thread::sleep(Duration::from_millis(10));
        service.write("a.txt", b"version-two").unwrap();

        let reloaded = cache.get_file(&service, Path::new("a.txt")).unwrap();
        assert_eq!(*reloaded, b"version-two".to_vec());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn byte_bound_evicts_least_recently_used() {
        let dir = TempDir::new().unwrap();
        let service = fs(&dir);
        service.write("a.txt", vec![0u8; 40].as_slice()).unwrap();
        service.write("b.txt", vec![0u8; 40].as_slice()).unwrap();

        let cache = ArtifactCache::new(CacheConfig {
            max_bytes: 50,
            max_entries: 100,
            ttl: Duration::from_secs(60),
        });

        cache.get_file(&service, Path::new("a.txt")).unwrap();
        cache.get_file(&service, Path::new("b.txt")).unwrap();

        assert!(cache.total_bytes() <= 50);
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn concurrent_requests_for_same_key_coalesce() {
        let dir = TempDir::new().unwrap();
        let service = fs(&dir);
        service.write("a.txt", b"hello").unwrap();

        let cache = Arc::new(ArtifactCache::new(CacheConfig::default()));
        let load_count = Arc::new(AtomicU64::new(0));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let service_root = dir.path().to_path_buf();
                let load_count = load_count.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    let fs = FileService::new(
                        &service_root,
                        FileServiceConfig::default(),
                        SecurityPolicy::default(),
                    )
                    .unwrap();
                    barrier.wait();
                    let key = CacheKey::file("a.txt");
                    let version = VersionMarker::from_stat(&fs.stat("a.txt").unwrap());
                    cache
                        .load_coalesced(key, version, || {
                            load_count.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            Ok(CacheValue::FileArtifact(Arc::new(fs.read("a.txt").unwrap())))
                        })
                        .unwrap()
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(load_count.load(Ordering::SeqCst), 1);
    }
}
