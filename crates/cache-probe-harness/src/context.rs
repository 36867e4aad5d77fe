//! Execution contexts and the class-scoped lifecycle around them.

use crate::components::SqrtCacheLayer;
use crate::error::HarnessError;
use cache_probe_cache::{CacheLayer, EventKind, NamedCache};
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::{info, warn};

/// Cache name used when none is configured.
pub const DEFAULT_CACHE_NAME: &str = "sqrt";

/// Capacity used when none is configured.
pub const DEFAULT_CONTEXT_MAX_SIZE: usize = 1000;

/// Wiring for one [`TestContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    cache_name: String,
    max_size: usize,
    ttl: Option<Duration>,
    event_kinds: Vec<EventKind>,
}

impl ContextConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ContextConfigBuilder {
        ContextConfigBuilder::new()
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Kinds the context's cache will emit.
    pub fn event_kinds(&self) -> &[EventKind] {
        &self.event_kinds
    }

    /// Rejects wiring that cannot produce a usable cache.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let scope = if self.cache_name.is_empty() {
            "<unnamed>"
        } else {
            self.cache_name.as_str()
        };
        if self.cache_name.trim().is_empty() {
            return Err(HarnessError::setup(scope, "cache name must not be empty"));
        }
        if self.max_size == 0 {
            return Err(HarnessError::setup(scope, "max_size must be at least 1"));
        }
        if self.event_kinds.is_empty() {
            return Err(HarnessError::setup(
                scope,
                "the cache must support at least one event kind",
            ));
        }
        if self.ttl == Some(Duration::ZERO) {
            return Err(HarnessError::setup(scope, "ttl must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfigBuilder::new().build()
    }
}

/// Builder for [`ContextConfig`].
///
/// Building never fails; problems are reported by
/// [`ContextConfig::validate`] when the context is created.
#[derive(Debug, Clone)]
pub struct ContextConfigBuilder {
    cache_name: String,
    max_size: usize,
    ttl: Option<Duration>,
    event_kinds: Vec<EventKind>,
}

impl ContextConfigBuilder {
    pub fn new() -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            max_size: DEFAULT_CONTEXT_MAX_SIZE,
            ttl: None,
            event_kinds: EventKind::ALL.to_vec(),
        }
    }

    /// Name of the cache the components memoize into.
    ///
    /// Default: `"sqrt"`
    pub fn cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    /// Default: 1000
    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Default: None (entries never expire)
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Default: all four kinds
    pub fn event_kinds(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.event_kinds = kinds.into_iter().collect();
        self
    }

    pub fn build(self) -> ContextConfig {
        ContextConfig {
            cache_name: self.cache_name,
            max_size: self.max_size,
            ttl: self.ttl,
            event_kinds: self.event_kinds,
        }
    }
}

impl Default for ContextConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Types that can be built from a [`TestContext`].
///
/// Implementations resolve their own dependencies through the same context,
/// which is how two components end up sharing one cache.
pub trait FromContext: Sized {
    fn from_context(ctx: &TestContext) -> Result<Self, HarnessError>;
}

/// A fully wired execution context: one memoizing cache layer and the
/// components resolved against it.
///
/// Destroying the context clears its cache. A context that is dropped
/// without [`destroy`](TestContext::destroy) is destroyed on drop.
pub struct TestContext {
    config: ContextConfig,
    layer: SqrtCacheLayer,
    destroyed: bool,
}

impl TestContext {
    /// Validates `config` and builds the cache layer it describes.
    pub fn create(config: ContextConfig) -> Result<Self, HarnessError> {
        config.validate()?;

        let mut builder = CacheLayer::<i32, i32, f64>::builder()
            .name(config.cache_name.clone())
            .max_size(config.max_size)
            .event_kinds(config.event_kinds.iter().copied())
            .key_extractor(|i: &i32| *i);
        if let Some(ttl) = config.ttl {
            builder = builder.ttl(ttl);
        }
        let layer = builder
            .try_build()
            .map_err(|err| HarnessError::setup(config.cache_name.as_str(), err.to_string()))?;

        #[cfg(feature = "tracing")]
        info!(
            cache = %config.cache_name,
            max_size = config.max_size,
            ttl = ?config.ttl,
            "test context created"
        );

        Ok(Self {
            config,
            layer,
            destroyed: false,
        })
    }

    /// Builds a `T` from this context.
    pub fn resolve<T: FromContext>(&self) -> Result<T, HarnessError> {
        T::from_context(self)
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// The layer every cached component is built from.
    pub fn layer(&self) -> &SqrtCacheLayer {
        &self.layer
    }

    /// The cache behind [`layer`](Self::layer).
    pub fn cache(&self) -> &NamedCache<i32, f64> {
        self.layer.cache()
    }

    /// Tears the context down.
    ///
    /// The cache is cleared even on error. Listeners still registered at this
    /// point are reported as a [`HarnessError::Teardown`].
    pub fn destroy(mut self) -> Result<(), HarnessError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), HarnessError> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;

        let cache = self.layer.cache();
        let leaked = cache.listener_count();
        cache.clear();

        #[cfg(feature = "tracing")]
        info!(cache = %cache.name(), "test context destroyed");

        if leaked > 0 {
            #[cfg(feature = "tracing")]
            warn!(cache = %cache.name(), leaked, "listeners outlived the test context");

            return Err(HarnessError::teardown(
                cache.name(),
                format!("{leaked} listener(s) still registered"),
            ));
        }
        Ok(())
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            err.report_dropped("test context");
        }
    }
}

/// Owns the one [`TestContext`] of a test class.
///
/// Created with [`new`](ClassScope::new) the context is built on first use;
/// [`start`](ClassScope::start) builds it immediately. Either way it is
/// destroyed by [`stop`](ClassScope::stop), or when the scope is dropped.
pub struct ClassScope {
    name: String,
    config: ContextConfig,
    context: Option<TestContext>,
    stopped: bool,
}

impl ClassScope {
    /// Creates a scope whose context is built lazily.
    pub fn new(name: impl Into<String>, config: ContextConfig) -> Self {
        Self {
            name: name.into(),
            config,
            context: None,
            stopped: false,
        }
    }

    /// Creates a scope and builds its context right away.
    pub fn start(name: impl Into<String>, config: ContextConfig) -> Result<Self, HarnessError> {
        let mut scope = Self::new(name, config);
        scope.context()?;
        Ok(scope)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true while a context exists.
    pub fn is_active(&self) -> bool {
        self.context.is_some()
    }

    /// The class context, built on first call.
    pub fn context(&mut self) -> Result<&TestContext, HarnessError> {
        if self.stopped {
            return Err(HarnessError::setup(
                self.name.as_str(),
                "class scope has already been stopped",
            ));
        }
        let ctx = match self.context.take() {
            Some(ctx) => ctx,
            None => TestContext::create(self.config.clone())?,
        };
        Ok(self.context.insert(ctx))
    }

    /// Resolves a fresh `T` from the class context.
    pub fn instantiate<T: FromContext>(&mut self) -> Result<T, HarnessError> {
        self.context()?.resolve()
    }

    /// Destroys the context if one was built. Later calls are no-ops.
    pub fn stop(&mut self) -> Result<(), HarnessError> {
        self.stopped = true;
        match self.context.take() {
            Some(ctx) => ctx.destroy(),
            None => Ok(()),
        }
    }
}

impl Drop for ClassScope {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            err.report_dropped("class scope");
        }
    }
}
