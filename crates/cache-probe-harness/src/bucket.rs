//! Per-test storage of captured cache events.

use cache_probe_cache::{CacheEntryEvent, CacheKey, CacheValue, EventKind};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Slots<K, V> = [Vec<CacheEntryEvent<K, V>>; EventKind::COUNT];

/// Captured events, one arrival-ordered sequence per [`EventKind`].
///
/// Clones share the same storage: the registry's listeners hold one clone and
/// write into it, the test holds another and reads from it. Only the
/// registry can append.
pub struct EventBucket<K, V> {
    slots: Arc<Mutex<Slots<K, V>>>,
}

impl<K, V> Clone for EventBucket<K, V> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<K: CacheKey, V: CacheValue> EventBucket<K, V> {
    /// Creates an empty bucket.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Default::default())),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots<K, V>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Events of one kind, in arrival order. Empty if none arrived.
    pub fn get(&self, kind: EventKind) -> Vec<CacheEntryEvent<K, V>> {
        self.slots()[kind.index()].clone()
    }

    /// Number of events of one kind.
    pub fn count(&self, kind: EventKind) -> usize {
        self.slots()[kind.index()].len()
    }

    /// Number of events across all kinds.
    pub fn total(&self) -> usize {
        self.slots().iter().map(Vec::len).sum()
    }

    /// Returns true if no event of any kind has been captured.
    pub fn is_empty(&self) -> bool {
        self.slots().iter().all(Vec::is_empty)
    }

    /// Empties every slot. Slots keep their allocation.
    pub fn clear(&self) {
        for slot in self.slots().iter_mut() {
            slot.clear();
        }
    }

    /// Appends a batch under a single lock acquisition.
    pub(crate) fn append(&self, kind: EventKind, events: &[CacheEntryEvent<K, V>]) {
        self.slots()[kind.index()].extend_from_slice(events);
    }
}

impl<K: CacheKey, V: CacheValue> Default for EventBucket<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: CacheKey, V: CacheValue> fmt::Debug for EventBucket<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots();
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind, &slots[kind.index()].len());
        }
        map.finish()
    }
}
