//! Error taxonomy for the harness.
//!
//! Failures fall into three groups that are reported differently:
//! - setup failures ([`HarnessError::Setup`], [`HarnessError::UnsupportedEventKind`])
//!   abort the remaining test methods of a class;
//! - [`HarnessError::Assertion`] fails one test method only;
//! - [`HarnessError::Teardown`] is reported next to, never instead of, an
//!   assertion failure from the same method.

use cache_probe_cache::{EventKind, ListenerError};
use thiserror::Error;

/// Errors produced while setting up, running or tearing down cache tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// The context or a subscription could not be built before a test body ran.
    #[error("setup failed for '{scope}': {reason}")]
    Setup {
        /// What was being set up (a class, a context, a cache).
        scope: String,
        /// Why it failed.
        reason: String,
    },

    /// A listener was requested for a kind the cache does not emit.
    #[error("cache '{cache}' does not support {kind} listeners")]
    UnsupportedEventKind {
        /// The offending kind.
        kind: EventKind,
        /// Name of the cache.
        cache: String,
    },

    /// A caching invariant did not hold.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// Releasing a subscription or destroying a context failed.
    #[error("teardown failed for '{scope}': {reason}")]
    Teardown {
        /// What was being torn down.
        scope: String,
        /// Why it failed.
        reason: String,
    },
}

impl HarnessError {
    /// Creates a [`HarnessError::Setup`].
    pub fn setup(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Setup {
            scope: scope.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`HarnessError::Assertion`].
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// Creates a [`HarnessError::Teardown`].
    pub fn teardown(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Teardown {
            scope: scope.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures that happen before a test body runs.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            HarnessError::Setup { .. } | HarnessError::UnsupportedEventKind { .. }
        )
    }

    /// Returns `true` if a caching invariant was violated.
    pub fn is_assertion(&self) -> bool {
        matches!(self, HarnessError::Assertion(_))
    }

    /// Returns `true` for failures while releasing resources.
    pub fn is_teardown(&self) -> bool {
        matches!(self, HarnessError::Teardown { .. })
    }

    /// Logs a failure that surfaced in a `Drop` impl, where it cannot be returned.
    #[allow(unused_variables)]
    pub(crate) fn report_dropped(&self, during: &'static str) {
        #[cfg(feature = "tracing")]
        tracing::warn!(during, error = %self, "teardown failed while dropping");
    }
}

impl From<ListenerError> for HarnessError {
    fn from(err: ListenerError) -> Self {
        match &err {
            ListenerError::UnsupportedEventKind { kind, cache } => {
                HarnessError::UnsupportedEventKind {
                    kind: *kind,
                    cache: cache.clone(),
                }
            }
            ListenerError::UnknownSubscription { cache, .. } => HarnessError::Teardown {
                scope: cache.clone(),
                reason: err.to_string(),
            },
        }
    }
}
