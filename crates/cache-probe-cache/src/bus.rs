//! The named cache and its entry event bus.
//!
//! [`NamedCache`] is a cloneable handle to one shared key/value store. Every
//! mutation is reported to registered listeners as a [`CacheEntryEvent`],
//! synchronously, before the mutating call returns. Events are dispatched
//! outside the store lock, in batches that only ever contain one
//! [`EventKind`].

use crate::error::ListenerError;
use crate::events::{CacheEntryEvent, EventKind};
use crate::store::{CacheStore, Lookup};
use cache_probe_core::{BoxedEventListener, EventListener, EventListeners, ListenerId};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};

#[cfg(feature = "tracing")]
use tracing::{info, trace};

/// Bounds for cache keys.
pub trait CacheKey: Hash + Eq + Clone + Send + Sync + fmt::Debug + 'static {}

impl<T> CacheKey for T where T: Hash + Eq + Clone + Send + Sync + fmt::Debug + 'static {}

/// Bounds for cached values.
pub trait CacheValue: Clone + Send + Sync + fmt::Debug + 'static {}

impl<T> CacheValue for T where T: Clone + Send + Sync + fmt::Debug + 'static {}

/// Token returned by [`NamedCache::register_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(ListenerId);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Forwards only the event kinds a listener subscribed to.
struct KindFilter<K, V> {
    kinds: [bool; EventKind::COUNT],
    inner: BoxedEventListener<CacheEntryEvent<K, V>>,
}

impl<K, V> KindFilter<K, V> {
    fn accepts(&self, kind: EventKind) -> bool {
        self.kinds[kind.index()]
    }
}

impl<K: CacheKey, V: CacheValue> EventListener<CacheEntryEvent<K, V>> for KindFilter<K, V> {
    fn on_event(&self, event: &CacheEntryEvent<K, V>) {
        if self.accepts(event.kind) {
            self.inner.on_event(event);
        }
    }

    fn on_batch(&self, events: &[CacheEntryEvent<K, V>]) {
        // batches are homogeneous by kind
        if events.first().is_some_and(|e| self.accepts(e.kind)) {
            self.inner.on_batch(events);
        }
    }
}

struct Shared<K, V> {
    name: String,
    supported: [bool; EventKind::COUNT],
    store: Mutex<CacheStore<K, V>>,
    listeners: RwLock<EventListeners<CacheEntryEvent<K, V>>>,
}

/// A named, bounded key/value cache that emits entry lifecycle events.
///
/// Clones share the same store and the same listener set.
///
/// # Examples
///
/// ```
/// use cache_probe_cache::{CacheEntryEvent, EventKind, NamedCache};
/// use cache_probe_core::FnListener;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let cache: NamedCache<u32, String> = NamedCache::new("users", 100, None, &EventKind::ALL);
///
/// let created = Arc::new(AtomicUsize::new(0));
/// let c = Arc::clone(&created);
/// let handle = cache
///     .register_listener(
///         &[EventKind::Created],
///         Arc::new(FnListener::new(move |_: &CacheEntryEvent<u32, String>| {
///             c.fetch_add(1, Ordering::SeqCst);
///         })),
///     )
///     .unwrap();
///
/// cache.put(1, "alice".to_string());
/// cache.put(1, "alicia".to_string()); // an update, not a creation
/// assert_eq!(created.load(Ordering::SeqCst), 1);
///
/// cache.deregister_listener(handle).unwrap();
/// ```
pub struct NamedCache<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for NamedCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K: CacheKey, V: CacheValue> NamedCache<K, V> {
    /// Creates a cache holding at most `max_size` entries.
    ///
    /// `event_kinds` lists the kinds listeners may subscribe to; asking for
    /// any other kind fails with [`ListenerError::UnsupportedEventKind`].
    pub fn new(
        name: impl Into<String>,
        max_size: usize,
        ttl: Option<Duration>,
        event_kinds: &[EventKind],
    ) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "cache_entry_events_total",
                "Total number of entry lifecycle events emitted, by kind"
            );
            describe_gauge!("cache_size", "Current number of entries in the cache");
        }

        let mut supported = [false; EventKind::COUNT];
        for kind in event_kinds {
            supported[kind.index()] = true;
        }

        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                supported,
                store: Mutex::new(CacheStore::new(max_size, ttl)),
                listeners: RwLock::new(EventListeners::new()),
            }),
        }
    }

    /// Name of this cache, carried as the source of every event.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns true if listeners may subscribe to `kind`.
    pub fn supports(&self, kind: EventKind) -> bool {
        self.shared.supported[kind.index()]
    }

    fn store(&self) -> MutexGuard<'_, CacheStore<K, V>> {
        self.shared
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks a key up. An expired entry is dropped, reported as
    /// [`EventKind::Expired`], and treated as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let lookup = self.store().get(key);
        match lookup {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss => None,
            Lookup::Expired(old) => {
                self.dispatch(vec![self.event(EventKind::Expired, key.clone(), Some(old), None)]);
                None
            }
        }
    }

    /// Returns true if the key is present, without affecting recency or expiry.
    pub fn contains_key(&self, key: &K) -> bool {
        self.store().contains(key)
    }

    /// Stores a value, emitting [`EventKind::Created`] for a new key or
    /// [`EventKind::Updated`] for an existing one. A capacity eviction is
    /// reported as [`EventKind::Removed`].
    pub fn put(&self, key: K, value: V) {
        let events = self.put_locked(&mut self.store(), key, value);
        self.dispatch(events);
    }

    /// Stores several values. Consecutive events of one kind are dispatched
    /// as a single batch, in the order they happened.
    pub fn put_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let events: Vec<_> = {
            let mut store = self.store();
            entries
                .into_iter()
                .flat_map(|(key, value)| self.put_locked(&mut store, key, value))
                .collect()
        };
        self.dispatch(events);
    }

    fn put_locked(
        &self,
        store: &mut CacheStore<K, V>,
        key: K,
        value: V,
    ) -> Vec<CacheEntryEvent<K, V>> {
        let insertion = store.insert(key.clone(), value.clone());
        let mut events = Vec::with_capacity(2);
        if let Some((evicted_key, evicted_value)) = insertion.evicted {
            #[cfg(feature = "tracing")]
            info!(cache = %self.shared.name, key = ?evicted_key, "Cache eviction occurred");
            events.push(self.event(EventKind::Removed, evicted_key, Some(evicted_value), None));
        }
        match insertion.previous {
            Some(old) => events.push(self.event(EventKind::Updated, key, Some(old), Some(value))),
            None => events.push(self.event(EventKind::Created, key, None, Some(value))),
        }
        events
    }

    /// Removes a key, emitting [`EventKind::Removed`] if it was present.
    pub fn remove(&self, key: &K) -> bool {
        let removed = self.store().remove(key);
        match removed {
            Some(old) => {
                self.dispatch(vec![self.event(EventKind::Removed, key.clone(), Some(old), None)]);
                true
            }
            None => false,
        }
    }

    /// Drops every expired entry and reports them as one
    /// [`EventKind::Expired`] batch. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let expired = self.store().drain_expired();
        let count = expired.len();
        let events = expired
            .into_iter()
            .map(|(key, old)| self.event(EventKind::Expired, key, Some(old), None))
            .collect();
        self.dispatch(events);
        count
    }

    /// Removes every entry. No events are emitted.
    pub fn clear(&self) {
        self.store().clear();
        self.record_size(0);
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.store().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes `listener` to the given kinds.
    ///
    /// Fails without registering anything if any requested kind is not
    /// supported by this cache.
    pub fn register_listener(
        &self,
        kinds: &[EventKind],
        listener: BoxedEventListener<CacheEntryEvent<K, V>>,
    ) -> Result<SubscriptionHandle, ListenerError> {
        let mut filter = [false; EventKind::COUNT];
        for &kind in kinds {
            if !self.supports(kind) {
                return Err(ListenerError::UnsupportedEventKind {
                    kind,
                    cache: self.shared.name.clone(),
                });
            }
            filter[kind.index()] = true;
        }

        let id = self
            .shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(KindFilter {
                kinds: filter,
                inner: listener,
            });
        Ok(SubscriptionHandle(id))
    }

    /// Releases a subscription made with [`register_listener`](Self::register_listener).
    pub fn deregister_listener(&self, handle: SubscriptionHandle) -> Result<(), ListenerError> {
        let removed = self
            .shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(handle.0);
        if removed {
            Ok(())
        } else {
            Err(ListenerError::UnknownSubscription {
                id: handle.0,
                cache: self.shared.name.clone(),
            })
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.shared
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn event(
        &self,
        kind: EventKind,
        key: K,
        old_value: Option<V>,
        new_value: Option<V>,
    ) -> CacheEntryEvent<K, V> {
        CacheEntryEvent::new(kind, key, old_value, new_value, &self.shared.name)
    }

    fn dispatch(&self, events: Vec<CacheEntryEvent<K, V>>) {
        if events.is_empty() {
            return;
        }
        self.record_size(self.len());

        for event in &events {
            #[cfg(feature = "tracing")]
            trace!(cache = %self.shared.name, kind = %event.kind, key = ?event.key, "entry event");

            #[cfg(feature = "metrics")]
            counter!(
                "cache_entry_events_total",
                "cache" => self.shared.name.clone(),
                "kind" => event.kind.as_str()
            )
            .increment(1);
        }

        // Snapshot so listeners may (de)register without deadlocking.
        let listeners = self
            .shared
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        // Each run of same-kind events is one batch; runs keep arrival order.
        for batch in events.chunk_by(|a, b| a.kind == b.kind) {
            listeners.emit_batch(batch);
        }
    }

    #[allow(unused_variables)]
    fn record_size(&self, size: usize) {
        #[cfg(feature = "metrics")]
        gauge!("cache_size", "cache" => self.shared.name.clone()).set(size as f64);
    }
}

impl<K, V> fmt::Debug for NamedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedCache")
            .field("name", &self.shared.name)
            .finish_non_exhaustive()
    }
}
