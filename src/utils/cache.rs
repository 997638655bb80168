use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Cached value together with the instant it was stored.
#[derive(Clone, Debug)]
pub struct CacheItem<T> {
    pub data: T,
    pub timestamp: Instant,
    pub ttl: Duration,
}

impl<T> CacheItem<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        Self { data, timestamp: Instant::now(), ttl }
    }

    pub fn is_expired(&self) -> bool {
        self.timestamp.elapsed() > self.ttl
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    pub invalidations: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    }
}

/// Key -> (value, timestamp) store, TTL-checked on read.
///
/// Shared between the timer tasks through an `Arc`; all methods take `&self`.
#[derive(Debug)]
pub struct TtlCache<K: Eq + Hash, V> {
    entries: DashMap<K, CacheItem<V>>,
    default_ttl: Duration,
    pub stats: CacheStats,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self { entries: DashMap::new(), default_ttl, stats: CacheStats::default() }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the cached value if present and not expired. Expired entries are evicted.
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(item) = self.entries.get(key) {
            if !item.is_expired() {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(item.data.clone());
            }
        }
        // the read guard must be dropped before removing
        if self.entries.remove_if(key, |_, item| item.is_expired()).is_some() {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, CacheItem::new(value, self.default_ttl));
    }

    pub fn contains_fresh(&self, key: &K) -> bool {
        self.entries.get(key).map(|item| !item.is_expired()).unwrap_or(false)
    }

    /// Drops every entry. Called whenever the pool set changes.
    pub fn invalidate_all(&self) {
        self.entries.clear();
        self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, item| {
            let expired = now.duration_since(item.timestamp) > item.ttl;
            if expired {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
            !expired
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_basic_operations() {
        let cache: TtlCache<String, f64> = TtlCache::new(Duration::from_secs(60));

        assert!(cache.get(&"pool-1".to_string()).is_none());

        cache.insert("pool-1".to_string(), 2000.0);
        assert_eq!(cache.get(&"pool-1".to_string()), Some(2000.0));
        assert!(cache.contains_fresh(&"pool-1".to_string()));

        assert_eq!(cache.stats.hits.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats.misses.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_expired_entries_are_evicted_on_read() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_millis(1));
        cache.insert(1, 10);
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.get(&1), None);
        assert!(cache.is_empty());
        assert_eq!(cache.stats.evictions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_cleanup_expired_keeps_fresh_entries() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_millis(200));
        cache.insert(1, 10);
        std::thread::sleep(Duration::from_millis(250));
        cache.insert(2, 20);

        cache.cleanup_expired();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), Some(20));
        assert_eq!(cache.stats.evictions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_invalidate_all() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert(1, 10);
        cache.insert(2, 20);

        cache.invalidate_all();
        cache.invalidate_all();

        assert!(cache.is_empty());
        assert_eq!(cache.stats.invalidations.load(Ordering::Relaxed), 2);
    }
}
