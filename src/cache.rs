//! Bounded in-memory cache shared by the embedding and translation layers.
//!
//! Eviction is insertion-order (oldest inserted first). Lookups do not touch
//! ordering, so there is no access-time bookkeeping. All operations take a
//! short mutex guard; a poisoned lock is recovered since the cache only ever
//! holds recomputable values.

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
}

struct CacheInner<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
}

/// FIFO-evicting cache with a fixed capacity.
pub struct BoundedCache<K, V> {
    inner: Mutex<CacheInner<K, V>>,
    max_size: usize,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_size,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<K, V>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("cache lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Exact-key lookup.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().entries.get(key).cloned()
    }

    /// Insert a value, evicting the oldest entries once capacity is exceeded.
    ///
    /// Replacing an existing key keeps its original insertion slot.
    pub fn insert(&self, key: K, value: V) {
        if self.max_size == 0 {
            return;
        }

        let mut inner = self.lock();
        if let Some(existing) = inner.entries.get_mut(&key) {
            *existing = value;
            return;
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(key, value);

        while inner.entries.len() > self.max_size {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.max_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_get_after_insert() {
        let cache = BoundedCache::new(4);
        cache.insert("a".to_string(), 1);

        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_evicts_oldest_inserted_first() {
        let max_size = 5;
        let extra = 3;
        let cache = BoundedCache::new(max_size);

        for i in 0..(max_size + extra) {
            cache.insert(i, i * 10);
        }

        assert_eq!(cache.len(), max_size);
        for evicted in 0..extra {
            assert_eq!(cache.get(&evicted), None);
        }
        for kept in extra..(max_size + extra) {
            assert_eq!(cache.get(&kept), Some(kept * 10));
        }
    }

    #[test]
    fn test_lookup_does_not_refresh_order() {
        let cache = BoundedCache::new(2);
        cache.insert(1, "one");
        cache.insert(2, "two");

        // reading the oldest entry must not protect it from eviction
        assert_eq!(cache.get(&1), Some("one"));
        cache.insert(3, "three");

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some("two"));
        assert_eq!(cache.get(&3), Some("three"));
    }

    #[test]
    fn test_replace_keeps_slot() {
        let cache = BoundedCache::new(2);
        cache.insert(1, "one");
        cache.insert(2, "two");
        cache.insert(1, "uno");
        cache.insert(3, "three");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&3), Some("three"));
    }

    #[test]
    fn test_clear_and_stats() {
        let cache = BoundedCache::new(10);
        cache.insert("x".to_string(), 1);
        cache.insert("y".to_string(), 2);

        assert_eq!(cache.stats(), CacheStats { size: 2, max_size: 10 });

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().max_size, 10);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = BoundedCache::new(0);
        cache.insert(1, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_inserts_respect_bound() {
        let cache = Arc::new(BoundedCache::new(50));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.insert(t * 1000 + i, i);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(cache.len(), 50);
    }
}
