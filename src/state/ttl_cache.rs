use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

// ---------------------------------------------------------------------------
// TtlCache
// ---------------------------------------------------------------------------

/// Keyed cache with a fixed time-to-live and lazy expiry.
///
/// Expiry is checked on access, and every insert drops whatever else has
/// expired, so keys that are never read again do not pile up. There is no
/// sweeper task. Concurrent
/// misses on the same key may both run their fetch and both store the result,
/// last writer wins. Values are cloned out, so wrap large values in `Arc`.
///
/// Empty or failed upstream results are cached like any other value so a
/// failing provider is hit at most once per TTL window per key.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, if any. An expired entry is dropped and reads as absent.
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_fresh(self.ttl) {
                return Some(entry.value.clone());
            }
        }
        // The read guard above is released before removal to avoid a shard deadlock.
        self.entries.remove_if(key, |_, entry| !entry.is_fresh(self.ttl));
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.purge_expired();
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Return the cached value for `key`, or run `fetch`, store its result and
    /// return it. `fetch` is not invoked while a fresh entry exists.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(&key) {
            debug!(key = ?key, "cache hit");
            return value;
        }

        debug!(key = ?key, "cache miss, fetching");
        let value = fetch().await;
        self.insert(key, value.clone());
        value
    }

    /// Drop one entry so the next request refetches. Returns whether it existed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Number of fresh entries.
    pub fn len(&self) -> usize {
        self.purge_expired();
        self.entries.len()
    }

    fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.is_fresh(ttl));
    }
}
