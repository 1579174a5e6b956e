use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

/// Bounded LRU map shared by the dictionary's three cache tiers.
///
/// A capacity of 0 disables the cache: inserts are dropped and every get misses.
pub struct TermCache<K: Hash + Eq, V> {
    inner: Option<Mutex<LruCache<K, V>>>,
}

impl<K: Hash + Eq, V: Clone> TermCache<K, V> {
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Returns true when the cache has a non-zero capacity.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |cache| cache.lock().cap().get())
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |cache| cache.lock().len())
    }

    /// Returns true when no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up `key`, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let cache = self.inner.as_ref()?;
        cache.lock().get(key).cloned()
    }

    /// Returns true when `key` is cached, without touching recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|cache| cache.lock().contains(key))
    }

    /// Inserts `key`, evicting the least recently used entry on overflow.
    ///
    /// Returns true when an entry was evicted to make room.
    pub fn insert(&self, key: K, value: V) -> bool {
        let Some(cache) = self.inner.as_ref() else {
            return false;
        };
        let mut guard = cache.lock();
        if guard.contains(&key) {
            guard.put(key, value);
            return false;
        }
        guard.push(key, value).is_some()
    }

    /// Removes `key`, returning its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.as_ref()?.lock().pop(key)
    }
}
