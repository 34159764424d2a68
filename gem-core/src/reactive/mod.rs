//! Reactive Stores
//!
//! This module implements the observable state containers that drive element
//! re-rendering.
//!
//! # Concepts
//!
//! ## Stores
//!
//! A [`Store`] is a JSON object plus an ordered set of subscriber callbacks.
//! [`Store::update`] deep-merges a partial object and then notifies every
//! subscriber, synchronously and in subscription order.
//!
//! ## Subscribers
//!
//! Subscribers are identified by [`SubscriberId`]. Connecting the same id
//! twice keeps a single registration, so one update runs the callback once.
//!
//! ## Batches
//!
//! [`batch()`] defers notifications until the closure returns, running each
//! pending subscriber once.
//!
//! ## Registry
//!
//! [`StoreRegistry`] owns named stores so they can be passed to elements
//! explicitly.

mod batch;
mod registry;
mod store;
mod subscriber;

pub use batch::{batch, is_batching};
pub use registry::StoreRegistry;
pub use store::{
    connect, create_store, disconnect, merge_values, update_store, Store, StoreId, Subscription,
};
pub use subscriber::{Callback, Subscriber, SubscriberId};
