//! Stale-while-revalidate cache.
//!
//! Provides a keyed, async-aware cache with:
//! - Immediate answers from cached entries, stale or not
//! - One backend fetch per key for concurrent misses
//! - At most one background refresh per key once an entry is older than the
//!   dedupe interval
//! - Stale values kept when a background refresh fails
//! - Generation counter so a refresh never resurrects invalidated data
//! - Bounded capacity with oldest-first eviction

use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Display};
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

// =============================================================================
// Constants
// =============================================================================

/// Entries younger than this are served without a background refresh.
pub const DEFAULT_DEDUPE_INTERVAL: Duration = Duration::from_secs(2);

/// Maximum number of entries kept per cache.
pub const DEFAULT_CAPACITY: usize = 1024;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub dedupe_interval: Duration,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dedupe_interval: DEFAULT_DEDUPE_INTERVAL,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

// =============================================================================
// Cache
// =============================================================================

struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

struct Inner<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    /// Keys with a background refresh running
    in_flight: StdMutex<HashSet<K>>,
    /// Per-key locks that serialize fetches on a miss
    miss_locks: StdMutex<HashMap<K, Arc<Mutex<()>>>>,
    generation: AtomicU64,
    config: CacheConfig,
}

/// Keyed stale-while-revalidate cache. Clones share the same entries.
pub struct RevalidatingCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for RevalidatingCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> RevalidatingCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                in_flight: StdMutex::new(HashSet::new()),
                miss_locks: StdMutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                config: CacheConfig {
                    capacity: config.capacity.max(1),
                    ..config
                },
            }),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config
    }

    /// Return the cached value for `key`, or fetch it.
    ///
    /// A hit returns at once. When the entry is older than the dedupe
    /// interval, `fetch` runs in the background and replaces the entry on
    /// success. A miss awaits `fetch` and stores the result; its error is
    /// returned to the caller. Concurrent misses on one key wait for the
    /// first fetch and reuse its value.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let hit = {
            let entries = self.inner.entries.read().await;
            entries
                .get(&key)
                .map(|e| (e.value.clone(), e.fetched_at.elapsed() >= self.inner.config.dedupe_interval))
        };

        if let Some((value, stale)) = hit {
            if stale {
                self.spawn_revalidation(key, fetch);
            }
            return Ok(value);
        }

        let lock = self.miss_lock(&key);
        let result = {
            let _guard = lock.lock().await;
            match self.peek(&key).await {
                // Filled by the caller that held the lock before us
                Some(value) => Ok(value),
                None => {
                    let generation = self.generation();
                    match fetch().await {
                        Ok(value) => {
                            self.store_if_current(key.clone(), value.clone(), generation).await;
                            Ok(value)
                        }
                        Err(e) => Err(e),
                    }
                }
            }
        };
        self.release_miss_lock(&key, &lock);
        result
    }

    /// Cached value without fetching or refreshing.
    pub async fn peek(&self, key: &K) -> Option<V> {
        self.inner
            .entries
            .read()
            .await
            .get(key)
            .map(|e| e.value.clone())
    }

    /// Seed `key` with a known value, as if it had just been fetched.
    pub async fn mutate(&self, key: K, value: V) {
        self.bump_generation();
        let mut entries = self.inner.entries.write().await;
        Self::insert_bounded(&mut entries, key, value, self.inner.config.capacity);
    }

    /// Drop one entry.
    pub async fn invalidate(&self, key: &K) -> bool {
        self.bump_generation();
        self.inner.entries.write().await.remove(key).is_some()
    }

    /// Drop every entry whose key matches `predicate`. Returns how many went.
    pub async fn invalidate_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&K) -> bool,
    {
        self.bump_generation();
        let mut entries = self.inner.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| !predicate(k));
        before - entries.len()
    }

    pub async fn clear(&self) {
        self.bump_generation();
        self.inner.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.read().await.is_empty()
    }

    /// True while a background refresh for `key` is running.
    pub async fn is_revalidating(&self, key: &K) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    fn bump_generation(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn miss_lock(&self, key: &K) -> Arc<Mutex<()>> {
        let mut locks = self.inner.miss_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    fn release_miss_lock(&self, key: &K, lock: &Arc<Mutex<()>>) {
        let mut locks = self.inner.miss_locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Held by the map and by us only: nobody else is waiting on this key
        if Arc::strong_count(lock) <= 2 {
            locks.remove(key);
        }
    }

    fn spawn_revalidation<F, Fut, E>(&self, key: K, fetch: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let Some(marker) = InFlight::claim(Arc::clone(&self.inner), key.clone()) else {
            return;
        };

        let cache = self.clone();
        let generation = self.generation();
        debug!(key = ?key, "Revalidating stale cache entry");

        tokio::spawn(async move {
            // Dropped on completion or panic alike
            let _marker = marker;
            match fetch().await {
                Ok(value) => cache.store_if_current(key.clone(), value, generation).await,
                Err(e) => warn!(key = ?key, "Revalidation failed, keeping stale value: {}", e),
            }
        });
    }

    async fn store_if_current(&self, key: K, value: V, generation: u64) {
        let mut entries = self.inner.entries.write().await;
        // Checked under the write lock so invalidation cannot interleave
        if self.generation() != generation {
            debug!(key = ?key, "Discarding fetch result from before invalidation");
            return;
        }
        Self::insert_bounded(&mut entries, key, value, self.inner.config.capacity);
    }

    fn insert_bounded(entries: &mut HashMap<K, Entry<V>>, key: K, value: V, capacity: usize) {
        if !entries.contains_key(&key) && entries.len() >= capacity {
            let mut by_age: Vec<(K, Instant)> = entries.iter().map(|(k, e)| (k.clone(), e.fetched_at)).collect();
            by_age.sort_by_key(|(_, t)| *t);

            let to_remove = entries.len() + 1 - capacity;
            for (old, _) in by_age.into_iter().take(to_remove) {
                entries.remove(&old);
            }
            debug!("Cache at capacity, evicted {} entries", to_remove);
        }

        entries.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }
}

/// Marks a key as being revalidated until dropped.
struct InFlight<K: Eq + Hash, V> {
    inner: Arc<Inner<K, V>>,
    key: K,
}

impl<K: Eq + Hash + Clone, V> InFlight<K, V> {
    /// None when a refresh for `key` is already running.
    fn claim(inner: Arc<Inner<K, V>>, key: K) -> Option<Self> {
        let claimed = inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        claimed.then_some(Self { inner, key })
    }
}

impl<K: Eq + Hash, V> Drop for InFlight<K, V> {
    fn drop(&mut self) {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn always_stale() -> CacheConfig {
        CacheConfig {
            dedupe_interval: Duration::ZERO,
            capacity: 16,
        }
    }

    async fn settle(cache: &RevalidatingCache<&'static str, u32>, key: &'static str) {
        for _ in 0..100 {
            if !cache.is_revalidating(&key).await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("revalidation did not finish");
    }

    #[tokio::test]
    async fn test_miss_fetches_and_hit_within_interval_does_not() {
        let cache = RevalidatingCache::new(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let value = cache
                .get_or_fetch("k", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7u32)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_hit_returns_old_value_then_refreshes() {
        let cache = RevalidatingCache::new(always_stale());
        cache.mutate("k", 1u32).await;

        let value = cache
            .get_or_fetch("k", || async { Ok::<_, String>(2) })
            .await
            .unwrap();
        assert_eq!(value, 1);

        settle(&cache, "k").await;
        assert_eq!(cache.peek(&"k").await, Some(2));
    }

    #[tokio::test]
    async fn test_failed_revalidation_keeps_stale_value() {
        let cache = RevalidatingCache::new(always_stale());
        cache.mutate("k", 1u32).await;

        let value = cache
            .get_or_fetch("k", || async { Err::<u32, _>("backend down".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, 1);

        settle(&cache, "k").await;
        assert_eq!(cache.peek(&"k").await, Some(1));
    }

    #[tokio::test]
    async fn test_miss_error_is_returned_and_not_cached() {
        let cache: RevalidatingCache<&'static str, u32> = RevalidatingCache::new(CacheConfig::default());
        let err = cache
            .get_or_fetch("k", || async { Err::<u32, _>("boom".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidated_entry_is_not_resurrected() {
        let cache = RevalidatingCache::new(always_stale());
        cache.mutate("k", 1u32).await;

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        cache
            .get_or_fetch("k", move || async move {
                let _ = rx.await;
                Ok::<_, String>(99)
            })
            .await
            .unwrap();

        assert_eq!(cache.invalidate_where(|k| *k == "k").await, 1);
        tx.send(()).unwrap();
        settle(&cache, "k").await;

        assert_eq!(cache.peek(&"k").await, None);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let cache: RevalidatingCache<&'static str, u32> = RevalidatingCache::new(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(7u32)
                    })
                    .await
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok(7));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.inner.miss_locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_miss_lets_next_caller_fetch() {
        let cache: RevalidatingCache<&'static str, u32> = RevalidatingCache::new(CacheConfig::default());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let leader = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch("k", move || async move {
                        let _ = rx.await;
                        Err::<u32, _>("boom".to_string())
                    })
                    .await
            })
        };
        // Let the leader take the key first
        tokio::time::sleep(Duration::from_millis(20)).await;

        let follower = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_fetch("k", || async { Ok::<_, String>(3u32) }).await })
        };
        tx.send(()).unwrap();

        assert_eq!(leader.await.unwrap(), Err("boom".to_string()));
        assert_eq!(follower.await.unwrap(), Ok(3));
        assert_eq!(cache.peek(&"k").await, Some(3));
    }

    async fn exploding_fetch() -> Result<u32, String> {
        panic!("fetch blew up")
    }

    #[tokio::test]
    async fn test_panicked_revalidation_releases_key() {
        let cache = RevalidatingCache::new(always_stale());
        cache.mutate("k", 1u32).await;

        let value = cache.get_or_fetch("k", exploding_fetch).await.unwrap();
        assert_eq!(value, 1);
        settle(&cache, "k").await;

        // The key can be revalidated again
        cache
            .get_or_fetch("k", || async { Ok::<_, String>(2) })
            .await
            .unwrap();
        settle(&cache, "k").await;
        assert_eq!(cache.peek(&"k").await, Some(2));
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let cache = RevalidatingCache::new(CacheConfig {
            dedupe_interval: DEFAULT_DEDUPE_INTERVAL,
            capacity: 2,
        });
        cache.mutate("a", 1u32).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.mutate("b", 2).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.mutate("c", 3).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.peek(&"a").await, None);
        assert_eq!(cache.peek(&"c").await, Some(3));
    }
}
