//! Entry lifecycle events emitted by the cache.

use cache_probe_core::ProbeEvent;
use std::fmt;
use std::time::Instant;

/// The kind of mutation an entry went through.
///
/// This is a closed set; [`EventKind::ALL`] lists every kind in table order,
/// and [`EventKind::index`] gives each kind's slot in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// A key was populated for the first time (cache miss followed by store).
    Created,
    /// An existing key was overwritten.
    Updated,
    /// A key was removed explicitly or evicted for capacity.
    Removed,
    /// A key outlived its time-to-live.
    Expired,
}

impl EventKind {
    /// Number of event kinds.
    pub const COUNT: usize = 4;

    /// Every kind, in table order.
    pub const ALL: [EventKind; Self::COUNT] = [
        EventKind::Created,
        EventKind::Updated,
        EventKind::Removed,
        EventKind::Expired,
    ];

    /// Position of this kind in [`EventKind::ALL`].
    pub const fn index(self) -> usize {
        match self {
            EventKind::Created => 0,
            EventKind::Updated => 1,
            EventKind::Removed => 2,
            EventKind::Expired => 3,
        }
    }

    /// Stable snake_case label, used for event types and metric labels.
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::Removed => "removed",
            EventKind::Expired => "expired",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable record of one entry mutation.
///
/// Only the cache constructs these; observers receive them by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntryEvent<K, V> {
    pub(crate) kind: EventKind,
    pub(crate) key: K,
    pub(crate) old_value: Option<V>,
    pub(crate) new_value: Option<V>,
    pub(crate) source_name: String,
    pub(crate) timestamp: Instant,
}

impl<K, V> CacheEntryEvent<K, V> {
    pub(crate) fn new(
        kind: EventKind,
        key: K,
        old_value: Option<V>,
        new_value: Option<V>,
        source_name: &str,
    ) -> Self {
        Self {
            kind,
            key,
            old_value,
            new_value,
            source_name: source_name.to_owned(),
            timestamp: Instant::now(),
        }
    }

    /// What happened to the entry.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// The affected key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Value before the mutation, for updates, removals and expirations.
    pub fn old_value(&self) -> Option<&V> {
        self.old_value.as_ref()
    }

    /// Value after the mutation, for creations and updates.
    pub fn new_value(&self) -> Option<&V> {
        self.new_value.as_ref()
    }
}

impl<K, V> ProbeEvent for CacheEntryEvent<K, V>
where
    K: fmt::Debug + Send + Sync,
    V: fmt::Debug + Send + Sync,
{
    fn event_type(&self) -> &'static str {
        match self.kind {
            EventKind::Created => "entry_created",
            EventKind::Updated => "entry_updated",
            EventKind::Removed => "entry_removed",
            EventKind::Expired => "entry_expired",
        }
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn source_name(&self) -> &str {
        &self.source_name
    }
}
