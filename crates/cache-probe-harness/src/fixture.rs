//! Per-method fixture for the `sqrt` cache tests.
//!
//! A [`SqrtCacheFixture`] owns the listener subscription of one test method:
//! [`before_each`](SqrtCacheFixture::before_each) subscribes the bucket,
//! [`after_each`](SqrtCacheFixture::after_each) releases it and resets both
//! the bucket and the cache, so the next method starts from nothing.

use crate::bucket::EventBucket;
use crate::components::{CachedSqrt, CallPath, CallthroughSqrt, SqrtCall};
use crate::context::{FromContext, TestContext};
use crate::error::HarnessError;
use crate::registry::{ListenerRegistry, ListenerSubscription};
use cache_probe_cache::{CacheEntryEvent, EventKind, NamedCache};

#[cfg(feature = "tracing")]
use tracing::debug;

/// What a test body gets to work with: both call paths and the bucket that
/// observes their cache.
#[derive(Clone, Debug)]
pub struct SqrtCacheTest {
    cached: CachedSqrt,
    callthrough: CallthroughSqrt,
    bucket: EventBucket<i32, f64>,
    cache: NamedCache<i32, f64>,
}

impl SqrtCacheTest {
    /// The cached component, called directly.
    pub fn direct(&self) -> &CachedSqrt {
        &self.cached
    }

    /// The delegate that forwards to the cached component.
    pub fn indirect(&self) -> &CallthroughSqrt {
        &self.callthrough
    }

    /// The call handle for `path`.
    pub fn handle(&self, path: CallPath) -> &dyn SqrtCall {
        match path {
            CallPath::Direct => &self.cached,
            CallPath::Indirect => &self.callthrough,
        }
    }

    pub fn bucket(&self) -> &EventBucket<i32, f64> {
        &self.bucket
    }

    /// Captured events of one kind.
    pub fn events(&self, kind: EventKind) -> Vec<CacheEntryEvent<i32, f64>> {
        self.bucket.get(kind)
    }

    pub fn cache(&self) -> &NamedCache<i32, f64> {
        &self.cache
    }
}

impl FromContext for SqrtCacheTest {
    fn from_context(ctx: &TestContext) -> Result<Self, HarnessError> {
        Ok(Self {
            cached: ctx.resolve()?,
            callthrough: ctx.resolve()?,
            bucket: EventBucket::new(),
            cache: ctx.cache().clone(),
        })
    }
}

/// Before/after hooks around one test method.
pub struct SqrtCacheFixture {
    test: SqrtCacheTest,
    registry: ListenerRegistry<i32, f64>,
    kinds: Vec<EventKind>,
    subscription: Option<ListenerSubscription<i32, f64>>,
}

impl SqrtCacheFixture {
    /// A fixture that listens for `kinds` only.
    pub fn with_kinds(ctx: &TestContext, kinds: &[EventKind]) -> Result<Self, HarnessError> {
        let test: SqrtCacheTest = ctx.resolve()?;
        Ok(Self {
            registry: ListenerRegistry::new(test.cache.clone()),
            test,
            kinds: kinds.to_vec(),
            subscription: None,
        })
    }

    /// The state handed to the test body.
    pub fn instance(&self) -> &SqrtCacheTest {
        &self.test
    }

    /// Subscribes the bucket to the fixture's kinds.
    ///
    /// Fails with a setup error if the cache does not emit one of them. A
    /// subscription left over from an earlier method is released first.
    pub fn before_each(&mut self) -> Result<(), HarnessError> {
        if let Some(stale) = self.subscription.take() {
            stale.release()?;
        }
        self.subscription = Some(self.registry.subscribe(&self.kinds, &self.test.bucket)?);

        #[cfg(feature = "tracing")]
        debug!(
            cache = %self.test.cache.name(),
            size = self.test.cache.len(),
            "starting test method"
        );
        Ok(())
    }

    /// Releases the subscription, then empties the bucket and the cache.
    ///
    /// The resets happen even when releasing fails; that failure is returned
    /// afterwards.
    pub fn after_each(&mut self) -> Result<(), HarnessError> {
        let released = match self.subscription.take() {
            Some(subscription) => self.registry.unsubscribe(subscription),
            None => Ok(()),
        };

        #[cfg(feature = "tracing")]
        debug!(
            cache = %self.test.cache.name(),
            size = self.test.cache.len(),
            "finished test method"
        );

        self.test.bucket.clear();
        self.test.cache.clear();
        released
    }

    #[cfg(test)]
    pub(crate) fn subscription(&self) -> Option<&ListenerSubscription<i32, f64>> {
        self.subscription.as_ref()
    }

    /// Runs [`before_each`](Self::before_each) and returns a guard that runs
    /// [`after_each`](Self::after_each) when finished or dropped.
    pub fn begin(&mut self) -> Result<MethodGuard<'_>, HarnessError> {
        self.before_each()?;
        Ok(MethodGuard {
            fixture: self,
            finished: false,
        })
    }
}

impl FromContext for SqrtCacheFixture {
    fn from_context(ctx: &TestContext) -> Result<Self, HarnessError> {
        Self::with_kinds(ctx, &EventKind::ALL)
    }
}

/// One test method in progress. See [`SqrtCacheFixture::begin`].
pub struct MethodGuard<'a> {
    fixture: &'a mut SqrtCacheFixture,
    finished: bool,
}

impl MethodGuard<'_> {
    /// The state handed to the test body.
    pub fn test(&self) -> &SqrtCacheTest {
        &self.fixture.test
    }

    /// Ends the method, reporting teardown failures.
    pub fn finish(mut self) -> Result<(), HarnessError> {
        self.finished = true;
        self.fixture.after_each()
    }
}

impl Drop for MethodGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.fixture.after_each() {
                err.report_dropped("method guard");
            }
        }
    }
}
