//! Notification batching.
//!
//! Several store updates in a row usually only need one re-render per
//! subscriber. Inside [`batch`], store notifications are queued on a
//! thread-local list instead of running. When the outermost batch returns,
//! the list is flushed in order.
//!
//! The queue is keyed by [`SubscriberId`] across every store. Queuing a
//! subscriber that is already pending moves it to the back, so an element
//! observing several stores runs once per batch, after the last update that
//! touched any of them.

use std::cell::RefCell;

use indexmap::IndexMap;

use super::subscriber::{Subscriber, SubscriberId};

#[derive(Default)]
struct BatchState {
    depth: usize,
    pending: IndexMap<SubscriberId, Subscriber>,
}

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

/// Run `f` with store notifications deferred until it returns.
///
/// Batches nest; only the outermost one flushes.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _guard = BatchGuard::enter();
    f()
}

/// Whether the current thread is inside a batch.
pub fn is_batching() -> bool {
    BATCH.with(|state| state.borrow().depth > 0)
}

/// Queue `subscriber` if a batch is open. Returns `false` when the caller
/// should notify immediately.
pub(crate) fn defer(subscriber: &Subscriber) -> bool {
    BATCH.with(|state| {
        let mut state = state.borrow_mut();
        if state.depth == 0 {
            return false;
        }
        let id = subscriber.id();
        state.pending.shift_remove(&id);
        state.pending.insert(id, subscriber.clone());
        true
    })
}

struct BatchGuard;

impl BatchGuard {
    fn enter() -> Self {
        BATCH.with(|state| state.borrow_mut().depth += 1);
        Self
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let pending = BATCH.with(|state| {
            let mut state = state.borrow_mut();
            state.depth -= 1;
            if state.depth == 0 {
                std::mem::take(&mut state.pending)
            } else {
                IndexMap::new()
            }
        });

        if std::thread::panicking() {
            return;
        }

        if !pending.is_empty() {
            tracing::trace!(subscribers = pending.len(), "flushing batched notifications");
        }
        // Callbacks run with the thread-local released, so they may update
        // stores (notifying immediately) or open a new batch.
        for subscriber in pending.into_values() {
            subscriber.notify();
        }
    }
}
