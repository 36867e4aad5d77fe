//! Error types for cache.

use crate::events::EventKind;
use cache_probe_core::ListenerId;
use thiserror::Error;

/// Errors that can occur in the cache service.
#[derive(Debug, Error)]
pub enum CacheError<E> {
    /// The inner service returned an error.
    #[error("inner service error: {0}")]
    Inner(#[source] E),
}

impl<E> CacheError<E> {
    /// Converts this error into the inner error.
    pub fn into_inner(self) -> E {
        match self {
            CacheError::Inner(e) => e,
        }
    }
}

/// Errors raised when registering or releasing entry listeners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    /// The cache was not configured to emit this kind of event.
    #[error("cache '{cache}' does not support {kind} listeners")]
    UnsupportedEventKind {
        /// The kind that was requested.
        kind: EventKind,
        /// Name of the cache.
        cache: String,
    },

    /// No listener is registered under this id.
    #[error("cache '{cache}' has no subscription {id}")]
    UnknownSubscription {
        /// The id that was released.
        id: ListenerId,
        /// Name of the cache.
        cache: String,
    },
}
