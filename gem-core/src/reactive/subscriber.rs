//! Subscriber types for stores.
//!
//! A subscriber is any callback that wants to hear about store updates:
//! usually an element's `update`, sometimes application glue such as the
//! history title sync.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a subscriber.
///
/// Identity is what makes connecting idempotent: a store holds at most one
/// callback per id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Shared notification callback.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// A subscriber registered with a store.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    notify: Callback,
}

impl Subscriber {
    /// Create a subscriber with a fresh id.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_id(SubscriberId::new(), Arc::new(notify))
    }

    /// Create a subscriber for an existing id.
    pub fn with_id(id: SubscriberId, notify: Callback) -> Self {
        Self { id, notify }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Invoke the callback.
    pub fn notify(&self) {
        (self.notify)();
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}
