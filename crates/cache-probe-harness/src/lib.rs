//! Verification harness for memoizing caches.
//!
//! The harness checks that a cached computation is populated exactly once
//! per argument and returns stable results, whether it is called directly or
//! through a delegate. It observes the cache from the outside only, through
//! the entry events the cache emits.
//!
//! The pieces, from the bottom up:
//!
//! - [`EventBucket`]: captured events, one ordered sequence per [`EventKind`]
//! - [`ListenerRegistry`]: subscribes a bucket to a cache for one test method
//! - [`TestContext`] and [`ClassScope`]: one wired cache per test class,
//!   created before the first method and destroyed after the last
//! - [`SqrtCacheFixture`]: before/after hooks that keep methods isolated
//! - [`CachedCallVerifier`]: the exactly-once and stability checks
//! - [`ClassRunner`]: runs a list of test methods and reports per method
//!
//! # Example
//!
//! ```
//! use cache_probe_harness::{
//!     assert_path_equivalence, CachedCallVerifier, ClassScope, ContextConfig, SqrtCacheFixture,
//! };
//!
//! # async fn example() -> Result<(), cache_probe_harness::HarnessError> {
//! let mut scope = ClassScope::new("CachedBeanTest", ContextConfig::default());
//! let verifier = CachedCallVerifier::range(25);
//!
//! let mut direct: SqrtCacheFixture = scope.instantiate()?;
//! let guard = direct.begin()?;
//! let direct_results = verifier.verify(guard.test().direct(), guard.test().bucket()).await?;
//! guard.finish()?;
//!
//! let mut indirect: SqrtCacheFixture = scope.instantiate()?;
//! let guard = indirect.begin()?;
//! let indirect_results = verifier.verify(guard.test().indirect(), guard.test().bucket()).await?;
//! guard.finish()?;
//!
//! assert_path_equivalence(&direct_results, &indirect_results)?;
//! scope.stop()
//! # }
//! ```
//!
//! # Features
//!
//! - `tracing`: logs captured events, call results and lifecycle steps

mod bucket;
mod components;
mod context;
mod error;
mod fixture;
mod registry;
mod runner;
mod verifier;

pub use bucket::EventBucket;
pub use components::{
    CachedSqrt, CallPath, CallthroughSqrt, SqrtCacheLayer, SqrtCall, SqrtService,
};
pub use context::{
    ClassScope, ContextConfig, ContextConfigBuilder, FromContext, TestContext,
    DEFAULT_CACHE_NAME, DEFAULT_CONTEXT_MAX_SIZE,
};
pub use error::HarnessError;
pub use fixture::{MethodGuard, SqrtCacheFixture, SqrtCacheTest};
pub use registry::{ListenerRegistry, ListenerSubscription};
pub use runner::{ClassReport, ClassRunner, MethodOutcome};
pub use verifier::{assert_path_equivalence, CachedCallVerifier};

pub use cache_probe_cache::{CacheEntryEvent, EventKind};
