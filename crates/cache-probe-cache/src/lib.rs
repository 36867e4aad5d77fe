//! Memoizing cache middleware for Tower services, with an entry event bus.
//!
//! This crate provides a Tower middleware that stores successful responses
//! and returns them for later requests with the same key, together with the
//! [`NamedCache`] that backs it. The cache reports every entry mutation to
//! subscribed listeners, which is what makes caching behavior observable from
//! the outside.
//!
//! # Features
//!
//! - **Shared store**: every service built from one [`CacheLayer`] shares one [`NamedCache`]
//! - **Entry events**: Created, Updated, Removed and Expired, delivered synchronously
//! - **Runtime subscriptions**: register and deregister listeners per kind
//! - **TTL and LRU capacity**: expired entries are reported, evictions are reported as removals
//! - **Flexible Key Extraction**: User-defined key extraction from requests
//!
//! # Examples
//!
//! ```
//! use cache_probe_cache::CacheLayer;
//! use tower::ServiceBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache_layer: CacheLayer<u32, u32, f64> = CacheLayer::builder()
//!     .name("sqrt")
//!     .max_size(100)
//!     .ttl(Duration::from_secs(60))
//!     .key_extractor(|req: &u32| *req)
//!     .on_created(|event| println!("stored {:?}", event.key()))
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(cache_layer.clone())
//!     .service(tower::service_fn(|req: u32| async move {
//!         Ok::<_, std::io::Error>(f64::from(req).sqrt())
//!     }));
//! # Ok(())
//! # }
//! ```

mod bus;
mod config;
mod error;
mod events;
mod layer;
mod store;

pub use bus::{CacheKey, CacheValue, NamedCache, SubscriptionHandle};
pub use config::{CacheConfig, CacheConfigBuilder, ConfigError, KeyExtractor, DEFAULT_MAX_SIZE};
pub use error::{CacheError, ListenerError};
pub use events::{CacheEntryEvent, EventKind};
pub use layer::CacheLayer;

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "tracing")]
use tracing::debug;

/// A Tower [`Service`] that caches responses.
///
/// This service wraps an inner service and caches successful responses.
/// When a request comes in, the cache checks if a valid cached response
/// exists. If so, it returns the cached value immediately without calling
/// the inner service. On a miss the inner response is stored, which emits
/// an [`EventKind::Created`] event before the returned future resolves.
///
/// Responses must implement `Clone` to be cacheable.
pub struct Cache<S, Req, K, Resp> {
    inner: S,
    config: Arc<CacheConfig<Req, K>>,
    cache: NamedCache<K, Resp>,
}

impl<S, Req, K, Resp> Cache<S, Req, K, Resp>
where
    K: CacheKey,
    Resp: CacheValue,
{
    /// Creates a new `Cache` wrapping the given service and backed by `cache`.
    pub fn new(inner: S, config: Arc<CacheConfig<Req, K>>, cache: NamedCache<K, Resp>) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "cache_requests_total",
                "Total number of cache requests (hits and misses)"
            );
        }

        Self {
            inner,
            config,
            cache,
        }
    }

    /// The cache backing this service.
    pub fn cache(&self) -> &NamedCache<K, Resp> {
        &self.cache
    }
}

impl<S, Req, K, Resp> Clone for Cache<S, Req, K, Resp>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            cache: self.cache.clone(),
        }
    }
}

impl<S, Req, K> Service<Req> for Cache<S, Req, K, S::Response>
where
    S: Service<Req>,
    S::Response: CacheValue,
    K: CacheKey,
    Req: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = CacheError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(CacheError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = (self.config.key_extractor)(&req);

        if let Some(response) = self.cache.get(&key) {
            #[cfg(feature = "metrics")]
            {
                counter!(
                    "cache_requests_total",
                    "cache" => self.config.name.clone(),
                    "result" => "hit"
                )
                .increment(1);
            }

            #[cfg(feature = "tracing")]
            debug!(cache = %self.config.name, key = ?key, "Cache hit");

            return Box::pin(async move { Ok(response) });
        }

        #[cfg(feature = "metrics")]
        {
            counter!(
                "cache_requests_total",
                "cache" => self.config.name.clone(),
                "result" => "miss"
            )
            .increment(1);
        }

        #[cfg(feature = "tracing")]
        debug!(cache = %self.config.name, key = ?key, "Cache miss");

        let future = self.inner.call(req);
        let cache = self.cache.clone();

        Box::pin(async move {
            let response = future.await.map_err(CacheError::Inner)?;
            cache.put(key, response.clone());
            Ok(response)
        })
    }
}
