//! Store Implementation
//!
//! A Store is a JSON object made observable. Updates go through
//! [`Store::update`], which merges a partial object into the current state and
//! then notifies every subscriber.
//!
//! # Merge Semantics
//!
//! Nested plain objects merge key by key. Every other value, including arrays
//! and `null`, overwrites what was there. Keys that appear in neither the
//! state nor the partial never appear.
//!
//! # Notification
//!
//! Subscribers run synchronously, in the order they connected, after the
//! state lock is released. A subscriber may read or update the store it is
//! reacting to; such re-entrant updates are not guarded, so later subscribers
//! in the same pass observe the newer state.
//!
//! Inside [`batch`](super::batch()) notifications are queued instead and
//! flushed once when the outermost batch ends.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use smallvec::SmallVec;

use super::batch;
use super::subscriber::{Callback, Subscriber, SubscriberId};
use crate::error::{GemError, Result};

/// Unique identifier for a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(u64);

impl StoreId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store#{}", self.0)
    }
}

struct StoreInner {
    id: StoreId,
    state: RwLock<Map<String, Value>>,
    /// Insertion order is notification order.
    subscribers: RwLock<IndexMap<SubscriberId, Callback>>,
}

/// An observable state object.
///
/// Cloning a `Store` yields another handle to the same state and subscribers.
///
/// ```rust,ignore
/// let store = Store::new(json!({ "count": 0 }))?;
/// store.connect(SubscriberId::new(), || println!("changed"));
/// store.update(json!({ "count": 1 }))?; // prints "changed"
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store from an initial JSON object.
    pub fn new(initial: Value) -> Result<Self> {
        match initial {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(GemError::not_an_object(&other)),
        }
    }

    /// Create a store from an already-built object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                id: StoreId::next(),
                state: RwLock::new(map),
                subscribers: RwLock::new(IndexMap::new()),
            }),
        }
    }

    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    /// Merge `partial` into the state and notify subscribers.
    pub fn update(&self, partial: Value) -> Result<()> {
        let partial = match partial {
            Value::Object(map) => map,
            other => return Err(GemError::not_an_object(&other)),
        };
        {
            let mut state = self.inner.state.write();
            merge_object(&mut state, partial);
        }
        self.notify();
        Ok(())
    }

    /// Notify subscribers without changing the state.
    pub fn notify(&self) {
        let snapshot: SmallVec<[Subscriber; 4]> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(id, callback)| Subscriber::with_id(*id, Arc::clone(callback)))
            .collect();

        tracing::trace!(store = %self.id(), subscribers = snapshot.len(), "store updated");

        for subscriber in snapshot {
            if !batch::defer(&subscriber) {
                subscriber.notify();
            }
        }
    }

    /// Register `notify` under `id`.
    ///
    /// Returns `false` and keeps the existing callback if `id` is already
    /// subscribed.
    pub fn connect<F>(&self, id: SubscriberId, notify: F) -> bool
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.connect_callback(id, Arc::new(notify))
    }

    /// Register a shared callback under `id`. Idempotent per id.
    pub fn connect_callback(&self, id: SubscriberId, notify: Callback) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        if subscribers.contains_key(&id) {
            return false;
        }
        subscribers.insert(id, notify);
        true
    }

    /// Remove the subscriber `id`. Removing an unknown id is a no-op.
    pub fn disconnect(&self, id: SubscriberId) -> bool {
        self.inner.subscribers.write().shift_remove(&id).is_some()
    }

    /// Subscribe with a fresh id; the returned guard disconnects on drop.
    pub fn subscribe<F>(&self, notify: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriberId::new();
        self.connect(id, notify);
        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn is_connected(&self, id: SubscriberId) -> bool {
        self.inner.subscribers.read().contains_key(&id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Read a single top-level key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.state.read().get(key).cloned()
    }

    /// Clone the whole state.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.inner.state.read().clone())
    }

    /// Deserialize the state into a typed view.
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.snapshot())?)
    }

    /// Borrow the state for reading.
    pub fn with<R>(&self, f: impl FnOnce(&Map<String, Value>) -> R) -> R {
        f(&self.inner.state.read())
    }

    /// Mutate the state in place **without** notifying anyone.
    ///
    /// Subscribers will not re-render until the next [`update`](Self::update)
    /// or [`notify`](Self::notify).
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        f(&mut self.inner.state.write())
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Store {}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id())
            .field("state", &self.snapshot())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Guard returned by [`Store::subscribe`].
#[must_use = "dropping a Subscription disconnects it"]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: SubscriberId,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner.subscribers.write().shift_remove(&self.id);
        }
    }
}

/// Recursively merge `partial` into `target`.
///
/// Two objects merge key by key; anything else replaces `target`.
pub fn merge_values(target: &mut Value, partial: Value) {
    match (target, partial) {
        (Value::Object(target), Value::Object(partial)) => merge_object(target, partial),
        (target, partial) => *target = partial,
    }
}

fn merge_object(target: &mut Map<String, Value>, partial: Map<String, Value>) {
    for (key, value) in partial {
        match target.get_mut(&key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                merge_values(existing, value)
            }
            _ => {
                target.insert(key, value);
            }
        }
    }
}

/// Free-function form of [`Store::new`].
pub fn create_store(initial: Value) -> Result<Store> {
    Store::new(initial)
}

/// Free-function form of [`Store::update`].
pub fn update_store(store: &Store, partial: Value) -> Result<()> {
    store.update(partial)
}

/// Free-function form of [`Store::connect`].
pub fn connect<F>(store: &Store, id: SubscriberId, notify: F) -> bool
where
    F: Fn() + Send + Sync + 'static,
{
    store.connect(id, notify)
}

/// Free-function form of [`Store::disconnect`].
pub fn disconnect(store: &Store, id: SubscriberId) -> bool {
    store.disconnect(id)
}
