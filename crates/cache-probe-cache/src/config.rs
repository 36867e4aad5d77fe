//! Configuration for cache.

use crate::bus::{CacheKey, CacheValue, NamedCache};
use crate::error::ListenerError;
use crate::events::{CacheEntryEvent, EventKind};
use crate::layer::CacheLayer;
use cache_probe_core::{BoxedEventListener, FnListener};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Function that extracts a cache key from a request.
pub type KeyExtractor<Req, K> = Arc<dyn Fn(&Req) -> K + Send + Sync>;

/// Default maximum number of entries.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Per-request configuration shared by every service a [`CacheLayer`] produces.
pub struct CacheConfig<Req, K> {
    pub(crate) key_extractor: KeyExtractor<Req, K>,
    pub(crate) name: String,
}

impl<Req, K: CacheKey> CacheConfig<Req, K> {
    /// Creates a new configuration builder.
    pub fn builder<V: CacheValue>() -> CacheConfigBuilder<Req, K, V> {
        CacheConfigBuilder::new()
    }

    /// Name of the cache.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Errors detected while building a cache layer.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No key extractor was provided.
    #[error("key_extractor must be set before building")]
    MissingKeyExtractor,

    /// A builder callback asked for an event kind the cache does not emit.
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Builder for configuring and constructing a cache layer.
pub struct CacheConfigBuilder<Req, K, V> {
    max_size: usize,
    ttl: Option<Duration>,
    event_kinds: Vec<EventKind>,
    key_extractor: Option<KeyExtractor<Req, K>>,
    listeners: Vec<(EventKind, BoxedEventListener<CacheEntryEvent<K, V>>)>,
    name: String,
}

impl<Req, K: CacheKey, V: CacheValue> CacheConfigBuilder<Req, K, V> {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            ttl: None,
            event_kinds: EventKind::ALL.to_vec(),
            key_extractor: None,
            listeners: Vec::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the maximum number of entries in the cache.
    ///
    /// Default: 100
    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Sets the time-to-live for cached entries.
    ///
    /// If set, entries will expire after the specified duration.
    /// Default: None (no expiration)
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Restricts the event kinds listeners may subscribe to.
    ///
    /// Default: all four kinds
    pub fn event_kinds(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.event_kinds = kinds.into_iter().collect();
        self
    }

    /// Sets the function that extracts a cache key from a request.
    ///
    /// This function must be provided before building.
    pub fn key_extractor<F>(mut self, f: F) -> Self
    where
        F: Fn(&Req) -> K + Send + Sync + 'static,
    {
        self.key_extractor = Some(Arc::new(f));
        self
    }

    /// Sets the name of this cache instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn on_kind<F>(mut self, kind: EventKind, f: F) -> Self
    where
        F: Fn(&CacheEntryEvent<K, V>) + Send + Sync + 'static,
    {
        self.listeners.push((kind, Arc::new(FnListener::new(f))));
        self
    }

    /// Registers a callback to be invoked when a key is populated for the first time.
    pub fn on_created<F>(self, f: F) -> Self
    where
        F: Fn(&CacheEntryEvent<K, V>) + Send + Sync + 'static,
    {
        self.on_kind(EventKind::Created, f)
    }

    /// Registers a callback to be invoked when an existing key is overwritten.
    pub fn on_updated<F>(self, f: F) -> Self
    where
        F: Fn(&CacheEntryEvent<K, V>) + Send + Sync + 'static,
    {
        self.on_kind(EventKind::Updated, f)
    }

    /// Registers a callback to be invoked when an entry is removed or evicted.
    pub fn on_removed<F>(self, f: F) -> Self
    where
        F: Fn(&CacheEntryEvent<K, V>) + Send + Sync + 'static,
    {
        self.on_kind(EventKind::Removed, f)
    }

    /// Registers a callback to be invoked when an entry expires.
    pub fn on_expired<F>(self, f: F) -> Self
    where
        F: Fn(&CacheEntryEvent<K, V>) + Send + Sync + 'static,
    {
        self.on_kind(EventKind::Expired, f)
    }

    /// Builds the cache layer, reporting configuration mistakes.
    pub fn try_build(self) -> Result<CacheLayer<Req, K, V>, ConfigError> {
        let key_extractor = self
            .key_extractor
            .ok_or(ConfigError::MissingKeyExtractor)?;

        let cache = NamedCache::new(self.name.clone(), self.max_size, self.ttl, &self.event_kinds);
        for (kind, listener) in self.listeners {
            cache.register_listener(&[kind], listener)?;
        }

        let config = CacheConfig {
            key_extractor,
            name: self.name,
        };
        Ok(CacheLayer::new(config, cache))
    }

    /// Builds the cache layer.
    ///
    /// # Panics
    ///
    /// Panics if `key_extractor` was not set, or if a callback was registered
    /// for a kind excluded by [`event_kinds`](Self::event_kinds).
    pub fn build(self) -> CacheLayer<Req, K, V> {
        match self.try_build() {
            Ok(layer) => layer,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<Req, K: CacheKey, V: CacheValue> Default for CacheConfigBuilder<Req, K, V> {
    fn default() -> Self {
        Self::new()
    }
}
