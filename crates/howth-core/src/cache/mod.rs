//! Content-addressed transform cache.
//!
//! Maps `(content hash, config hash)` to a shared [`Artifact`]. Concurrent
//! requests for one key run a single computation and share its result;
//! failures are remembered for a short TTL so a broken file is not
//! re-transformed by every importer in the same build.
//!
//! ```text
//! get_or_compute(key)
//!   ├─ memory hit ─────────────► Arc<Artifact>
//!   ├─ remembered failure ─────► TransformError
//!   └─ miss ─► in-flight cell ─┬─ store hit ─► insert ─► Arc<Artifact>
//!                              └─ compute  ─► insert + write through
//! ```
//!
//! Eviction is least-recently-used under an entry bound and a byte bound.
//! Modules keep their own `Arc` to an artifact, so eviction never affects
//! the graph.

mod key;
mod stats;
mod store;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use howth_config::CacheOptions;
use howth_graph::Artifact;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::OnceCell;

use crate::transform::TransformError;

pub use key::CacheKey;
pub use stats::CacheStats;
pub use store::{ArtifactStore, CacheError, STORE_FILE, STORE_FORMAT_VERSION};

use stats::Counters;

type Computed = Result<Arc<Artifact>, TransformError>;

#[derive(Debug)]
enum SlotValue {
    Ready(Arc<Artifact>),
    Failed {
        error: TransformError,
        expires_at: Instant,
    },
}

#[derive(Debug)]
struct Slot {
    value: SlotValue,
    tick: u64,
    size: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    slots: FxHashMap<CacheKey, Slot>,
    /// Recency order: oldest tick first.
    order: BTreeMap<u64, CacheKey>,
    next_tick: u64,
    bytes: u64,
}

impl CacheState {
    fn touch(&mut self, key: &CacheKey) {
        let tick = self.next_tick;
        if let Some(slot) = self.slots.get_mut(key) {
            self.order.remove(&slot.tick);
            slot.tick = tick;
            self.order.insert(tick, *key);
            self.next_tick += 1;
        }
    }

    fn remove(&mut self, key: &CacheKey) -> Option<Slot> {
        let slot = self.slots.remove(key)?;
        self.order.remove(&slot.tick);
        self.bytes = self.bytes.saturating_sub(slot.size);
        Some(slot)
    }

    fn insert(&mut self, key: CacheKey, value: SlotValue, size: u64) {
        self.remove(&key);
        let tick = self.next_tick;
        self.next_tick += 1;
        self.order.insert(tick, key);
        self.slots.insert(key, Slot { value, tick, size });
        self.bytes += size;
    }

    /// Drop least recently used slots until both bounds hold. The newest
    /// slot always survives, even when it alone exceeds `max_bytes`.
    fn evict(&mut self, max_entries: usize, max_bytes: u64) -> u64 {
        let mut evicted = 0;
        while (self.slots.len() > max_entries || self.bytes > max_bytes) && self.slots.len() > 1 {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            if let Some(slot) = self.slots.remove(&key) {
                self.bytes = self.bytes.saturating_sub(slot.size);
                tracing::trace!(key = %key, size = slot.size, "evicted transform");
                evicted += 1;
            }
        }
        evicted
    }
}

/// Shared, bounded transform cache.
#[derive(Debug)]
pub struct TransformCache {
    state: Mutex<CacheState>,
    in_flight: DashMap<CacheKey, Arc<OnceCell<Computed>>>,
    store: Option<ArtifactStore>,
    counters: Counters,
    max_entries: usize,
    max_bytes: u64,
    negative_ttl: Duration,
}

impl TransformCache {
    /// In-memory cache with the limits from `options`; `options.dir` is
    /// ignored here, see [`open`](Self::open).
    pub fn new(options: &CacheOptions) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            in_flight: DashMap::new(),
            store: None,
            counters: Counters::default(),
            max_entries: options.max_entries.max(1),
            max_bytes: options.max_bytes,
            negative_ttl: options.negative_ttl(),
        }
    }

    /// Like [`new`](Self::new), plus the persistent store under
    /// `options.dir` when one is configured.
    pub fn open(options: &CacheOptions) -> Result<Self, CacheError> {
        let cache = Self::new(options);
        match &options.dir {
            Some(dir) => Ok(cache.with_store(ArtifactStore::open(dir)?)),
            None => Ok(cache),
        }
    }

    pub fn with_store(mut self, store: ArtifactStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn store_path(&self) -> Option<&Path> {
        self.store.as_ref().map(ArtifactStore::path)
    }

    /// Return the artifact for `key`, computing it at most once across all
    /// concurrent callers.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> Computed
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Artifact, TransformError>>,
    {
        if let Some(found) = self.lookup(&key) {
            return found;
        }

        let cell = self
            .in_flight
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let mut initialized_here = false;
        let initialized = &mut initialized_here;
        let result = cell
            .get_or_init(|| async move {
                *initialized = true;
                self.fill(key, compute).await
            })
            .await
            .clone();

        if !initialized_here {
            Counters::bump(&self.counters.coalesced);
        }
        self.in_flight
            .remove_if(&key, |_, current| Arc::ptr_eq(current, &cell));
        result
    }

    /// Memory hit or remembered failure; expired failures are dropped.
    fn lookup(&self, key: &CacheKey) -> Option<Computed> {
        let mut state = self.state.lock();
        let found = match &state.slots.get(key)?.value {
            SlotValue::Ready(artifact) => Some(Ok(Arc::clone(artifact))),
            SlotValue::Failed { error, expires_at } if Instant::now() < *expires_at => {
                Some(Err(error.clone()))
            }
            SlotValue::Failed { .. } => None,
        };
        let Some(found) = found else {
            state.remove(key);
            return None;
        };
        state.touch(key);
        drop(state);

        match &found {
            Ok(_) => Counters::bump(&self.counters.hits),
            Err(_) => Counters::bump(&self.counters.negative_hits),
        }
        Some(found)
    }

    /// Runs inside the in-flight cell: re-check memory, then the store,
    /// then compute and record.
    async fn fill<F, Fut>(&self, key: CacheKey, compute: F) -> Computed
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Artifact, TransformError>>,
    {
        // A previous cell may have finished between `lookup` and `entry`.
        if let Some(found) = self.lookup(&key) {
            return found;
        }

        if let Some(artifact) = self.load(&key) {
            Counters::bump(&self.counters.store_hits);
            let artifact = Arc::new(artifact);
            self.insert_ready(key, Arc::clone(&artifact));
            return Ok(artifact);
        }

        Counters::bump(&self.counters.misses);
        match compute().await {
            Ok(artifact) => {
                let artifact = Arc::new(artifact);
                self.insert_ready(key, Arc::clone(&artifact));
                self.persist(&key, &artifact);
                Ok(artifact)
            }
            Err(error) => {
                tracing::debug!(key = %key, error = %error, "caching transform failure");
                let mut state = self.state.lock();
                state.insert(
                    key,
                    SlotValue::Failed {
                        error: error.clone(),
                        expires_at: Instant::now() + self.negative_ttl,
                    },
                    0,
                );
                let evicted = state.evict(self.max_entries, self.max_bytes);
                drop(state);
                self.record_evictions(evicted);
                Err(error)
            }
        }
    }

    fn insert_ready(&self, key: CacheKey, artifact: Arc<Artifact>) {
        let size = artifact.byte_size() as u64;
        let mut state = self.state.lock();
        state.insert(key, SlotValue::Ready(artifact), size);
        let evicted = state.evict(self.max_entries, self.max_bytes);
        drop(state);
        self.record_evictions(evicted);
    }

    fn record_evictions(&self, evicted: u64) {
        if evicted > 0 {
            self.counters
                .evictions
                .fetch_add(evicted, std::sync::atomic::Ordering::Relaxed);
        }
    }

    fn load(&self, key: &CacheKey) -> Option<Artifact> {
        let store = self.store.as_ref()?;
        match store.get(key) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "artifact store read failed");
                None
            }
        }
    }

    fn persist(&self, key: &CacheKey, artifact: &Artifact) {
        if let Some(store) = &self.store {
            if let Err(err) = store.put(key, artifact) {
                tracing::warn!(key = %key, error = %err, "artifact store write failed");
            }
        }
    }

    /// Whether a ready artifact for `key` is in memory.
    pub fn contains(&self, key: &CacheKey) -> bool {
        matches!(
            self.state.lock().slots.get(key).map(|slot| &slot.value),
            Some(SlotValue::Ready(_))
        )
    }

    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes held by in-memory artifacts.
    pub fn bytes(&self) -> u64 {
        self.state.lock().bytes
    }

    /// Drop every in-memory entry. The persistent store is left alone; its
    /// keys carry the config hash, so stale entries are never matched.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.slots.len();
        *state = CacheState::default();
        tracing::debug!(dropped, "cleared transform cache");
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self::new(&CacheOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use howth_graph::{ConfigHash, ContentHash, SourceType};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(content: &str) -> CacheKey {
        CacheKey::new(
            ContentHash::of(content.as_bytes()),
            ConfigHash::builder().field("test").finish(),
        )
    }

    fn artifact(code: &str) -> Artifact {
        Artifact::new(code, Vec::new(), SourceType::JavaScript)
    }

    fn options(max_entries: usize, max_bytes: u64, negative_ttl_ms: u64) -> CacheOptions {
        CacheOptions {
            max_entries,
            max_bytes,
            negative_ttl_ms,
            dir: None,
        }
    }

    #[tokio::test]
    async fn hit_skips_compute() {
        let cache = TransformCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let artifact = cache
                .get_or_compute(key("a"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(artifact("a"))
                })
                .await
                .unwrap();
            assert_eq!(artifact.code, "a");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }

    #[tokio::test]
    async fn failures_are_remembered_until_the_ttl_expires() {
        let cache = TransformCache::new(&options(10, 1024, 20));
        let calls = AtomicUsize::new(0);
        let failing = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TransformError::new(PathBuf::from("/a.ts"), "unexpected token"))
        };

        assert!(cache.get_or_compute(key("bad"), failing).await.is_err());
        assert!(cache.get_or_compute(key("bad"), failing).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().negative_hits, 1);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get_or_compute(key("bad"), failing).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted() {
        let cache = TransformCache::new(&options(2, u64::MAX, 1000));
        for name in ["a", "b"] {
            cache
                .get_or_compute(key(name), || async { Ok(artifact(name)) })
                .await
                .unwrap();
        }
        // Touch "a" so "b" is the oldest.
        cache
            .get_or_compute(key("a"), || async { Ok(artifact("a")) })
            .await
            .unwrap();
        cache
            .get_or_compute(key("c"), || async { Ok(artifact("c")) })
            .await
            .unwrap();

        assert!(cache.contains(&key("a")));
        assert!(!cache.contains(&key("b")));
        assert!(cache.contains(&key("c")));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn byte_bound_keeps_the_newest_entry() {
        let cache = TransformCache::new(&options(100, 4, 1000));
        cache
            .get_or_compute(key("a"), || async { Ok(artifact("aaa")) })
            .await
            .unwrap();
        cache
            .get_or_compute(key("b"), || async { Ok(artifact("bbbbbb")) })
            .await
            .unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key("b")));
        assert_eq!(cache.bytes(), 6);
    }

    #[tokio::test]
    async fn evicted_artifacts_stay_valid_for_holders() {
        let cache = TransformCache::new(&options(1, u64::MAX, 1000));
        let held = cache
            .get_or_compute(key("a"), || async { Ok(artifact("a")) })
            .await
            .unwrap();
        cache
            .get_or_compute(key("b"), || async { Ok(artifact("b")) })
            .await
            .unwrap();

        assert!(!cache.contains(&key("a")));
        assert_eq!(held.code, "a");
    }

    #[tokio::test]
    async fn clear_forgets_everything() {
        let cache = TransformCache::default();
        cache
            .get_or_compute(key("a"), || async { Ok(artifact("a")) })
            .await
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.bytes(), 0);
    }

    #[tokio::test]
    async fn store_serves_a_fresh_cache() {
        let dir = tempfile::TempDir::new().unwrap();
        let with_dir = CacheOptions {
            dir: Some(dir.path().to_path_buf()),
            ..CacheOptions::default()
        };

        {
            let cache = TransformCache::open(&with_dir).unwrap();
            cache
                .get_or_compute(key("a"), || async { Ok(artifact("persisted")) })
                .await
                .unwrap();
        }

        let cache = TransformCache::open(&with_dir).unwrap();
        let artifact = cache
            .get_or_compute(key("a"), || async {
                Err(TransformError::new(PathBuf::from("/a.ts"), "should not run"))
            })
            .await
            .unwrap();
        assert_eq!(artifact.code, "persisted");
        assert_eq!(cache.stats().store_hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }
}
