//! Core infrastructure for cache-probe.
//!
//! This crate provides the event plumbing shared by the cache and the
//! verification harness:
//! - [`ProbeEvent`], the trait every observable event implements
//! - [`EventListener`] and [`FnListener`] for receiving events
//! - [`EventListeners`], an id-keyed listener collection that supports
//!   removal, so subscriptions can be released at runtime

pub mod events;

pub use events::{
    BoxedEventListener, EventListener, EventListeners, FnListener, ListenerId, ProbeEvent,
};
