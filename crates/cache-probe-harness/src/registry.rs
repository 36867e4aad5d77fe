//! Subscribing event buckets to a cache for the span of one test method.

use crate::bucket::EventBucket;
use crate::error::HarnessError;
use cache_probe_cache::{
    CacheEntryEvent, CacheKey, CacheValue, EventKind, NamedCache, SubscriptionHandle,
};
use cache_probe_core::EventListener;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::{trace, warn};

/// Appends every event of one kind into that kind's bucket slot.
struct BucketListener<K, V> {
    kind: EventKind,
    bucket: EventBucket<K, V>,
}

impl<K: CacheKey, V: CacheValue> BucketListener<K, V> {
    fn new(kind: EventKind, bucket: EventBucket<K, V>) -> Self {
        Self { kind, bucket }
    }
}

impl<K: CacheKey, V: CacheValue> EventListener<CacheEntryEvent<K, V>> for BucketListener<K, V> {
    fn on_event(&self, event: &CacheEntryEvent<K, V>) {
        self.on_batch(std::slice::from_ref(event));
    }

    fn on_batch(&self, events: &[CacheEntryEvent<K, V>]) {
        #[cfg(feature = "tracing")]
        for event in events {
            use cache_probe_core::ProbeEvent;
            trace!(
                cache = event.source_name(),
                kind = %self.kind,
                key = ?event.key(),
                "an entry has been {}",
                self.kind
            );
        }
        self.bucket.append(self.kind, events);
    }
}

/// Registers bucket listeners on a cache and releases them again.
pub struct ListenerRegistry<K, V> {
    cache: NamedCache<K, V>,
}

impl<K: CacheKey, V: CacheValue> ListenerRegistry<K, V> {
    /// Creates a registry for `cache`.
    pub fn new(cache: NamedCache<K, V>) -> Self {
        Self { cache }
    }

    /// Subscribes one listener per requested kind, each feeding `bucket`.
    ///
    /// Duplicate kinds are collapsed. If any kind is not supported by the
    /// cache, the kinds registered so far are released and
    /// [`HarnessError::UnsupportedEventKind`] is returned.
    pub fn subscribe(
        &self,
        kinds: &[EventKind],
        bucket: &EventBucket<K, V>,
    ) -> Result<ListenerSubscription<K, V>, HarnessError> {
        let mut subscription = ListenerSubscription {
            kinds: Vec::with_capacity(kinds.len()),
            handles: Vec::with_capacity(kinds.len()),
            cache: self.cache.clone(),
            released: false,
        };

        for &kind in kinds {
            if subscription.kinds.contains(&kind) {
                continue;
            }
            let listener = Arc::new(BucketListener::new(kind, bucket.clone()));
            // On error `subscription` drops here and releases what it holds.
            let handle = self.cache.register_listener(&[kind], listener)?;
            subscription.kinds.push(kind);
            subscription.handles.push(handle);
        }

        Ok(subscription)
    }

    /// Releases every listener held by `subscription`.
    pub fn unsubscribe(
        &self,
        subscription: ListenerSubscription<K, V>,
    ) -> Result<(), HarnessError> {
        subscription.release()
    }
}

/// Listeners registered for one test method.
///
/// Released explicitly with [`release`](ListenerSubscription::release) (or
/// [`ListenerRegistry::unsubscribe`]). A subscription that is dropped without
/// being released deregisters itself, so a failing test cannot leave a
/// listener behind.
pub struct ListenerSubscription<K: CacheKey, V: CacheValue> {
    kinds: Vec<EventKind>,
    handles: Vec<SubscriptionHandle>,
    cache: NamedCache<K, V>,
    released: bool,
}

impl<K: CacheKey, V: CacheValue> ListenerSubscription<K, V> {
    /// The subscribed kinds, in registration order.
    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    /// Tokens of the registered listeners, parallel to [`kinds`](Self::kinds).
    pub fn handles(&self) -> &[SubscriptionHandle] {
        &self.handles
    }

    /// Deregisters every listener. All handles are attempted even if one
    /// fails; the first failure is returned.
    pub fn release(mut self) -> Result<(), HarnessError> {
        self.release_all()
    }

    fn release_all(&mut self) -> Result<(), HarnessError> {
        self.released = true;
        let mut first_error = None;
        for handle in self.handles.drain(..) {
            if let Err(err) = self.cache.deregister_listener(handle) {
                first_error.get_or_insert(HarnessError::from(err));
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<K: CacheKey, V: CacheValue> Drop for ListenerSubscription<K, V> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        #[cfg(feature = "tracing")]
        if !self.handles.is_empty() {
            warn!(
                cache = %self.cache.name(),
                listeners = self.handles.len(),
                "subscription dropped without release; deregistering"
            );
        }
        if let Err(err) = self.release_all() {
            err.report_dropped("listener subscription");
        }
    }
}
