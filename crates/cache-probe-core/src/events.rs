//! Event system for cache observation.
//!
//! Provides the listener plumbing that the cache event bus uses to deliver
//! entry lifecycle events, and that the harness uses to capture them.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::warn;

/// Trait for events that can be observed through an [`EventListeners`] collection.
pub trait ProbeEvent: Send + Sync + fmt::Debug {
    /// Returns the type of event (e.g., "entry_created", "entry_removed").
    fn event_type(&self) -> &'static str;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Instant;

    /// Returns the name of the instance that emitted this event.
    fn source_name(&self) -> &str;
}

/// Trait for listening to events.
pub trait EventListener<E>: Send + Sync {
    /// Called when a single event occurs.
    fn on_event(&self, event: &E);

    /// Called when a batch of events is dispatched in one go.
    ///
    /// The default forwards each event to [`on_event`](EventListener::on_event)
    /// in order. Listeners that need to apply a batch atomically override this.
    fn on_batch(&self, events: &[E]) {
        for event in events {
            self.on_event(event);
        }
    }
}

/// Type alias for boxed event listeners.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// Identifier handed out when a listener is added, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A collection of event listeners.
///
/// Listeners are kept in registration order. Each one is identified by the
/// [`ListenerId`] returned from [`add`](EventListeners::add) or
/// [`add_arc`](EventListeners::add_arc).
pub struct EventListeners<E> {
    listeners: Vec<(ListenerId, BoxedEventListener<E>)>,
    next_id: u64,
}

impl<E: ProbeEvent> EventListeners<E> {
    /// Creates a new empty event listener collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Adds a listener to the collection.
    pub fn add<L>(&mut self, listener: L) -> ListenerId
    where
        L: EventListener<E> + 'static,
    {
        self.add_arc(Arc::new(listener))
    }

    /// Adds an already shared listener to the collection.
    pub fn add_arc(&mut self, listener: BoxedEventListener<E>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Removes the listener registered under `id`.
    ///
    /// Returns `false` if no such listener exists (already removed or never added).
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Emits a batch of events to all registered listeners.
    ///
    /// Each listener receives the whole batch in a single
    /// [`on_batch`](EventListener::on_batch) call. Empty batches are not
    /// dispatched.
    ///
    /// If a listener panics, the panic is caught and the remaining listeners
    /// will still be called.
    pub fn emit_batch(&self, events: &[E]) {
        let Some(first) = events.first() else {
            return;
        };
        for (id, listener) in &self.listeners {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_batch(events);
            }));
            if outcome.is_err() {
                Self::report_panic(*id, first.event_type());
            }
        }
    }

    #[allow(unused_variables)]
    fn report_panic(id: ListenerId, event_type: &'static str) {
        #[cfg(feature = "tracing")]
        warn!(listener = %id, event_type, "event listener panicked");
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
            next_id: self.next_id,
        }
    }
}

impl<E: ProbeEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A simple function-based event listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Creates a new function-based listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: ProbeEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
