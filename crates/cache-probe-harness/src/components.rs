//! The components under test: a memoized `sqrt` and a delegate that reaches
//! it indirectly.

use crate::context::{FromContext, TestContext};
use crate::error::HarnessError;
use cache_probe_cache::{Cache, CacheError, CacheLayer, NamedCache};
use futures::future::{self, BoxFuture, FutureExt, Ready};
use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

/// Layer that memoizes `sqrt` results keyed by the argument.
pub type SqrtCacheLayer = CacheLayer<i32, i32, f64>;

/// The uncached computation, counting how often it actually runs.
#[derive(Debug, Clone, Default)]
pub struct SqrtService {
    computations: Arc<AtomicUsize>,
}

impl SqrtService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the square root was computed.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }
}

impl Service<i32> for SqrtService {
    type Response = f64;
    type Error = Infallible;
    type Future = Ready<Result<f64, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, i: i32) -> Self::Future {
        self.computations.fetch_add(1, Ordering::SeqCst);
        future::ready(Ok(f64::from(i).sqrt()))
    }
}

/// How a call reaches the cached computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallPath {
    /// Straight into the cached component.
    Direct,
    /// Through a delegate that forwards to the cached component.
    Indirect,
}

impl fmt::Display for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallPath::Direct => f.write_str("direct"),
            CallPath::Indirect => f.write_str("indirect"),
        }
    }
}

/// A handle that computes `sqrt(i)` through some path.
pub trait SqrtCall: Send + Sync {
    fn sqrt(&self, i: i32) -> BoxFuture<'static, f64>;

    fn path(&self) -> CallPath;
}

/// `sqrt` behind the memoizing cache layer.
#[derive(Clone)]
pub struct CachedSqrt {
    service: Cache<SqrtService, i32, i32, f64>,
    computations: SqrtService,
}

impl CachedSqrt {
    /// Wraps a fresh [`SqrtService`] with `layer`.
    pub fn new(layer: &SqrtCacheLayer) -> Self {
        let inner = SqrtService::new();
        Self {
            service: layer.layer(inner.clone()),
            computations: inner,
        }
    }

    /// How many calls missed the cache and ran the computation.
    pub fn computations(&self) -> usize {
        self.computations.computations()
    }

    pub fn cache(&self) -> &NamedCache<i32, f64> {
        self.service.cache()
    }
}

impl SqrtCall for CachedSqrt {
    fn sqrt(&self, i: i32) -> BoxFuture<'static, f64> {
        let service = self.service.clone();
        async move {
            match service.oneshot(i).await {
                Ok(root) => root,
                Err(CacheError::Inner(never)) => match never {},
            }
        }
        .boxed()
    }

    fn path(&self) -> CallPath {
        CallPath::Direct
    }
}

impl FromContext for CachedSqrt {
    fn from_context(ctx: &TestContext) -> Result<Self, HarnessError> {
        Ok(Self::new(ctx.layer()))
    }
}

impl fmt::Debug for CachedSqrt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSqrt")
            .field("cache", &self.cache().name())
            .field("computations", &self.computations())
            .finish()
    }
}

/// Forwards every call to a [`CachedSqrt`].
#[derive(Clone, Debug)]
pub struct CallthroughSqrt {
    cached: CachedSqrt,
}

impl CallthroughSqrt {
    pub fn new(cached: CachedSqrt) -> Self {
        Self { cached }
    }

    /// Computations performed by the component this delegate forwards to.
    pub fn computations(&self) -> usize {
        self.cached.computations()
    }
}

impl SqrtCall for CallthroughSqrt {
    fn sqrt(&self, i: i32) -> BoxFuture<'static, f64> {
        self.cached.sqrt(i)
    }

    fn path(&self) -> CallPath {
        CallPath::Indirect
    }
}

impl FromContext for CallthroughSqrt {
    fn from_context(ctx: &TestContext) -> Result<Self, HarnessError> {
        Ok(Self::new(ctx.resolve()?))
    }
}
