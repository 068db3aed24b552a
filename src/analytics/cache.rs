//! Time-bounded result cache used by the analytics engine.
//!
//! Thin wrapper around [`moka::sync::Cache`] that adds hit/miss counters and
//! an explicit `invalidate_all`. Expiry is time-to-live only; staleness
//! against store writes is decided by the caller.

use moka::sync::Cache;
use serde::Serialize;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const MAX_ENTRIES: u64 = 64;

/// Longest accepted time-to-live (365 days). Longer values are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub struct TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<K, V>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        let ttl = ttl.min(MAX_TTL);
        let cache = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_live(ttl)
            .build();
        Self {
            cache,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get an unexpired entry, counting the hit or miss.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.cache.get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.cache.insert(key, value);
    }

    pub fn invalidate(&self, key: &K) {
        self.cache.invalidate(key);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_insert_and_stats() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&"k"), None);
        cache.insert("k", 7);
        assert_eq!(cache.get(&"k"), Some(7));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalidate() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.invalidate(&"a");
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        cache.invalidate_all();
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::from_millis(50));
        cache.insert("k", 1);
        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(cache.get(&"k"), None);
        assert_eq!(cache.ttl(), Duration::from_millis(50));
    }

    #[test]
    fn test_oversized_ttl_is_clamped() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::from_secs(u64::MAX));
        assert_eq!(cache.ttl(), MAX_TTL);
        cache.insert("k", 1);
        assert_eq!(cache.get(&"k"), Some(1));
    }
}
