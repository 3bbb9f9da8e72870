//! Object cache for parsed git output.
//!
//! Maps an identifier (full commit id, tag name) to the value parsed from
//! git the first time it was requested, so repeated lookups on the same
//! `Repository` handle skip the subprocess entirely.
//! - Bounded: least recently used entries are evicted past `capacity`
//! - Shared: guarded by a mutex, lookups take `&self`
//!
//! Used by: `Repository::get_commit()` and `Repository::get_tag()`

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::Serialize;

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

pub struct ObjectCache<T> {
    entries: Mutex<LruCache<String, Arc<T>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> ObjectCache<T> {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // The map holds no invariants a panicking holder could break.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, Arc<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        let found = self.lock().get(key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `value` under `key` and return the shared handle.
    pub fn insert(&self, key: impl Into<String>, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.lock().put(key.into(), Arc::clone(&value));
        value
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            entries: entries.len(),
            capacity: entries.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<T> Default for ObjectCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_the_stored_value() {
        let cache = ObjectCache::new(4);
        assert!(cache.get("a").is_none());

        let stored = cache.insert("a", 1u32);
        let fetched = cache.get("a").unwrap();
        assert!(Arc::ptr_eq(&stored, &fetched));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = ObjectCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.get("a").is_some());
        cache.insert("c", 3);

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_still_caches_one_entry() {
        let cache = ObjectCache::new(0);
        cache.insert("a", "x");
        assert_eq!(cache.stats().capacity, 1);
        assert!(cache.contains("a"));
    }

    #[test]
    fn clear_drops_entries() {
        let cache: ObjectCache<u8> = ObjectCache::default();
        cache.insert("a", 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().capacity, DEFAULT_CACHE_CAPACITY);
    }
}
