//! Cache storage implementation.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Entry in the cache with TTL tracking.
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        if let Some(ttl) = ttl {
            self.inserted_at.elapsed() > ttl
        } else {
            false
        }
    }
}

/// Result of looking a key up.
#[derive(Debug, PartialEq)]
pub(crate) enum Lookup<V> {
    Hit(V),
    Miss,
    /// The entry was present but past its TTL; it has been removed.
    Expired(V),
}

/// What an insert displaced.
#[derive(Debug, PartialEq)]
pub(crate) struct Insertion<K, V> {
    /// Previous value under the same key.
    pub(crate) previous: Option<V>,
    /// Least recently used entry dropped to make room.
    pub(crate) evicted: Option<(K, V)>,
}

/// LRU-bounded cache store with optional TTL.
pub(crate) struct CacheStore<K, V> {
    entries: lru::LruCache<K, CacheEntry<V>>,
    ttl: Option<Duration>,
}

impl<K: Hash + Eq + Clone, V: Clone> CacheStore<K, V> {
    /// Creates a new cache store with the given capacity and TTL.
    pub(crate) fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: lru::LruCache::new(cap),
            ttl,
        }
    }

    /// Looks up a key, dropping it if it has expired.
    pub(crate) fn get(&mut self, key: &K) -> Lookup<V> {
        match self.entries.get(key) {
            None => return Lookup::Miss,
            Some(entry) if !entry.is_expired(self.ttl) => return Lookup::Hit(entry.value.clone()),
            Some(_) => {}
        }

        // Entry expired, remove it
        match self.entries.pop(key) {
            Some(entry) => Lookup::Expired(entry.value),
            None => Lookup::Miss,
        }
    }

    /// Returns true if the key is present, without refreshing recency or checking TTL.
    pub(crate) fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Inserts a value, reporting what it replaced or evicted.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Insertion<K, V> {
        if self.entries.contains(&key) {
            let previous = self
                .entries
                .put(key, CacheEntry::new(value))
                .map(|entry| entry.value);
            return Insertion {
                previous,
                evicted: None,
            };
        }

        let evicted = if self.entries.len() >= self.entries.cap().get() {
            self.entries.pop_lru().map(|(k, entry)| (k, entry.value))
        } else {
            None
        };
        self.entries.put(key, CacheEntry::new(value));

        Insertion {
            previous: None,
            evicted,
        }
    }

    /// Removes a key, returning its value if it was present.
    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.pop(key).map(|entry| entry.value)
    }

    /// Removes every expired entry, oldest first.
    pub(crate) fn drain_expired(&mut self) -> Vec<(K, V)> {
        let ttl = self.ttl;
        let expired_keys: Vec<K> = self
            .entries
            .iter()
            .rev()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(k, _)| k.clone())
            .collect();

        expired_keys
            .into_iter()
            .filter_map(|k| self.entries.pop(&k).map(|entry| (k, entry.value)))
            .collect()
    }

    /// Returns the current number of entries in the cache.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Clears all entries from the cache.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
