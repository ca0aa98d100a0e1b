//! A small TTL cache keyed by domain.
//!
//! Two instances are used by the engine: one for MX validity and one for
//! catch-all verdicts. Both are shared across workers behind an `Arc`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct CacheEntry<V> {
    value: V,
    observed_at: Instant,
}

/// Thread-safe map from key to last observed value, where entries older than
/// `ttl` read as absent.
///
/// The lock is held only for the map operation itself, never across a lookup,
/// so concurrent misses on the same key may both refresh it.
#[derive(Debug)]
pub struct TtlCache<V = bool> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Copy> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value and its age, or `None` if the key is absent
    /// or its entry has reached the TTL.
    pub fn get(&self, key: &str) -> Option<(V, Duration)> {
        let entry = {
            let entries = self.entries.lock();
            entries.get(key).copied()
        }?;
        let age = entry.observed_at.elapsed();
        if age >= self.ttl {
            None
        } else {
            Some((entry.value, age))
        }
    }

    /// Records `value` for `key`, observed now.
    pub fn put(&self, key: &str, value: V) {
        let entry = CacheEntry {
            value,
            observed_at: Instant::now(),
        };
        self.entries.lock().insert(key.to_string(), entry);
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drops entries that have reached the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.observed_at.elapsed() < ttl);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn miss_when_absent() {
        let cache: TtlCache = TtlCache::new(Duration::from_secs(60));
        assert!(cache.get("example.com").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn hit_within_ttl() {
        let cache: TtlCache = TtlCache::new(Duration::from_secs(60));
        cache.put("example.com", false);
        let (value, age) = cache.get("example.com").unwrap();
        assert!(!value);
        assert!(age < Duration::from_secs(60));
    }

    #[test]
    fn stale_entries_read_as_misses() {
        let cache: TtlCache = TtlCache::new(Duration::from_millis(20));
        cache.put("example.com", true);
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("example.com").is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache: TtlCache = TtlCache::new(Duration::ZERO);
        cache.put("example.com", true);
        assert!(cache.get("example.com").is_none());
    }

    #[test]
    fn put_replaces_value() {
        let cache: TtlCache = TtlCache::new(Duration::from_secs(60));
        cache.put("example.com", false);
        cache.put("example.com", true);
        assert_eq!(cache.get("example.com").map(|(v, _)| v), Some(true));
        cache.clear();
        assert!(cache.get("example.com").is_none());
    }

    #[test]
    fn concurrent_writers_do_not_tear() {
        let cache: Arc<TtlCache> = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        cache.put("shared.com", i % 2 == 0);
                        let _ = cache.get("shared.com");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
        assert!(cache.get("shared.com").is_some());
    }
}
