//! Runs the test methods of one class against a shared context.

use crate::context::{ClassScope, ContextConfig};
use crate::error::HarnessError;
use crate::fixture::{SqrtCacheFixture, SqrtCacheTest};
use cache_probe_cache::EventKind;
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

type TestFuture = BoxFuture<'static, Result<(), HarnessError>>;
type TestBody = Box<dyn Fn(SqrtCacheTest) -> TestFuture + Send + Sync>;

/// Executes named test methods in order, one fixture per method, all inside
/// one [`ClassScope`].
///
/// - A setup failure (context creation, listener subscription) aborts the
///   class: the failing method and every later one are reported as skipped.
/// - A panic in a test body is caught and reported as an assertion failure.
/// - After every method that got past setup, the subscription is released
///   and both bucket and cache are cleared. Failures there are reported on
///   the method next to its assertion result.
/// - The context is destroyed once all methods have run, whatever happened.
///
/// # Examples
///
/// ```
/// use cache_probe_harness::{CachedCallVerifier, ClassRunner, ContextConfig};
/// use futures::FutureExt;
///
/// # async fn example() {
/// let report = ClassRunner::new("CachedBeanTest", ContextConfig::default())
///     .method("direct", |test| {
///         async move {
///             CachedCallVerifier::range(25)
///                 .verify(test.direct(), test.bucket())
///                 .await
///                 .map(drop)
///         }
///         .boxed()
///     })
///     .run()
///     .await;
/// assert!(report.passed());
/// # }
/// ```
pub struct ClassRunner {
    name: String,
    config: ContextConfig,
    listen_kinds: Vec<EventKind>,
    methods: Vec<(String, TestBody)>,
}

impl ClassRunner {
    /// Creates a runner for the class `name`, listening for every kind.
    pub fn new(name: impl Into<String>, config: ContextConfig) -> Self {
        Self {
            name: name.into(),
            config,
            listen_kinds: EventKind::ALL.to_vec(),
            methods: Vec::new(),
        }
    }

    /// Restricts the kinds each method's bucket listens for.
    pub fn listen_for(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.listen_kinds = kinds.into_iter().collect();
        self
    }

    /// Appends a test method.
    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(SqrtCacheTest) -> TestFuture + Send + Sync + 'static,
    {
        self.methods.push((name.into(), Box::new(body)));
        self
    }

    /// Runs every method and reports the outcome.
    pub async fn run(self) -> ClassReport {
        let ClassRunner {
            name,
            config,
            listen_kinds,
            methods,
        } = self;

        let mut scope = ClassScope::new(name.as_str(), config);
        let mut report = ClassReport::new(name);
        let mut methods = methods.into_iter();

        while let Some((method, body)) = methods.next() {
            let fixture = scope
                .context()
                .and_then(|ctx| SqrtCacheFixture::with_kinds(ctx, &listen_kinds))
                .and_then(|mut fixture| fixture.before_each().map(|()| fixture));
            let mut fixture = match fixture {
                Ok(fixture) => fixture,
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    warn!(
                        class = %report.class,
                        method = %method,
                        error = %err,
                        "setup failed; aborting class"
                    );

                    report.setup_error = Some(err);
                    report.skipped.push(method);
                    report.skipped.extend(methods.by_ref().map(|(name, _)| name));
                    break;
                }
            };

            #[cfg(feature = "tracing")]
            debug!(class = %report.class, method = %method, "running test method");

            let outcome = run_method(method, &mut fixture, &body).await;
            report.methods.push(outcome);
        }

        report.teardown_error = scope.stop().err();
        report
    }
}

impl fmt::Debug for ClassRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRunner")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("listen_kinds", &self.listen_kinds)
            .field(
                "methods",
                &self.methods.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Runs one body against a fixture that has already been set up, then tears
/// the fixture down. Both failures are kept.
async fn run_method(
    name: String,
    fixture: &mut SqrtCacheFixture,
    body: &TestBody,
) -> MethodOutcome {
    let test = fixture.instance().clone();
    let outcome = AssertUnwindSafe(async move { body(test).await })
        .catch_unwind()
        .await;
    let assertion = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err),
        Err(panic) => Some(HarnessError::assertion(panic_message(&*panic))),
    };
    let teardown = fixture.after_each().err();

    MethodOutcome {
        name,
        assertion,
        teardown,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "test body panicked".to_string()
    }
}

/// Result of one test method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodOutcome {
    pub name: String,
    /// Failure of the body itself, including caught panics.
    pub assertion: Option<HarnessError>,
    /// Failure while cleaning up after the body.
    pub teardown: Option<HarnessError>,
}

impl MethodOutcome {
    pub fn passed(&self) -> bool {
        self.assertion.is_none() && self.teardown.is_none()
    }
}

/// Result of a [`ClassRunner`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassReport {
    pub class: String,
    /// The setup failure that aborted the class, if any.
    pub setup_error: Option<HarnessError>,
    /// Methods that ran, in order.
    pub methods: Vec<MethodOutcome>,
    /// Methods that never ran because setup failed.
    pub skipped: Vec<String>,
    /// Failure while destroying the context.
    pub teardown_error: Option<HarnessError>,
}

impl ClassReport {
    fn new(class: String) -> Self {
        Self {
            class,
            setup_error: None,
            methods: Vec::new(),
            skipped: Vec::new(),
            teardown_error: None,
        }
    }

    /// Returns true if every method ran and passed and the class set up and
    /// tore down cleanly.
    pub fn passed(&self) -> bool {
        self.setup_error.is_none()
            && self.teardown_error.is_none()
            && self.skipped.is_empty()
            && self.methods.iter().all(MethodOutcome::passed)
    }

    /// The outcome of the method called `name`, if it ran.
    pub fn outcome(&self, name: &str) -> Option<&MethodOutcome> {
        self.methods.iter().find(|m| m.name == name)
    }
}
