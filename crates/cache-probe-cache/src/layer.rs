use crate::bus::{CacheKey, CacheValue, NamedCache};
use crate::{Cache, CacheConfig, CacheConfigBuilder};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that applies response caching to a service.
///
/// Every service produced by [`layer()`](Layer::layer) shares the same
/// [`NamedCache`], so a response stored through one service is a hit through
/// any other. Use [`cache()`](CacheLayer::cache) to reach the underlying
/// store, for example to register entry listeners or clear it.
///
/// # Examples
///
/// ```
/// use cache_probe_cache::CacheLayer;
/// use tower::ServiceBuilder;
/// use std::time::Duration;
///
/// # async fn example() {
/// let cache_layer: CacheLayer<String, String, String> = CacheLayer::builder()
///     .max_size(100)
///     .ttl(Duration::from_secs(60))
///     .key_extractor(|req: &String| req.clone())
///     .build();
///
/// // Both services share the same cache
/// let service1 = ServiceBuilder::new()
///     .layer(cache_layer.clone())
///     .service(my_service());
///
/// let service2 = ServiceBuilder::new()
///     .layer(cache_layer)
///     .service(my_service());
/// # }
/// # fn my_service() -> impl tower::Service<String, Response = String, Error = std::io::Error> {
/// #     tower::service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) })
/// # }
/// ```
pub struct CacheLayer<Req, K, V> {
    config: Arc<CacheConfig<Req, K>>,
    cache: NamedCache<K, V>,
}

impl<Req, K, V> Clone for CacheLayer<Req, K, V> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            cache: self.cache.clone(),
        }
    }
}

impl<Req, K: CacheKey, V: CacheValue> CacheLayer<Req, K, V> {
    /// Creates a new `CacheLayer` over an existing cache.
    pub fn new(config: CacheConfig<Req, K>, cache: NamedCache<K, V>) -> Self {
        Self {
            config: Arc::new(config),
            cache,
        }
    }

    /// Creates a new builder for configuring a cache layer.
    pub fn builder() -> CacheConfigBuilder<Req, K, V> {
        CacheConfigBuilder::new()
    }

    /// The cache shared by every service this layer produces.
    pub fn cache(&self) -> &NamedCache<K, V> {
        &self.cache
    }
}

impl<S, Req, K, V> Layer<S> for CacheLayer<Req, K, V>
where
    S: tower::Service<Req, Response = V>,
    K: CacheKey,
    V: CacheValue,
{
    type Service = Cache<S, Req, K, V>;

    fn layer(&self, service: S) -> Self::Service {
        Cache::new(service, Arc::clone(&self.config), self.cache.clone())
    }
}
