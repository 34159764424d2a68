//! Gem Core
//!
//! This crate provides the runtime behind the Gem custom-element framework.
//! It implements:
//!
//! - Observable stores with merge updates and batched notification
//! - A render task pool drained one frame at a time under a time budget
//! - Custom element lifecycle with reactive attributes and properties
//! - A navigation stack mirrored onto a browser-like history, with
//!   open/close handlers and session persistence
//! - A bounded LRU cache
//!
//! Browser primitives (the session history, session storage, the frame
//! source) are traits with in-memory implementations, so the whole runtime
//! runs and tests natively.
//!
//! # Architecture
//!
//! - `reactive`: stores, subscribers, batching and the store registry
//! - `scheduler`: render pool and frame scheduler
//! - `component`: element definitions, lifecycle and rendering
//! - `history`: navigation stack, query strings, native history
//! - `storage`: session storage with JSON encoding
//! - `cache`: LRU cache with expiry
//!
//! # Example
//!
//! ```rust
//! use gem_core::reactive::{create_store, update_store};
//! use serde_json::json;
//!
//! let store = create_store(json!({ "a": 1 })).unwrap();
//! let _sub = store.subscribe(|| println!("changed"));
//!
//! update_store(&store, json!({ "b": 2 })).unwrap();
//! assert_eq!(store.snapshot(), json!({ "a": 1, "b": 2 }));
//! ```

pub mod cache;
pub mod component;
pub mod config;
pub mod error;
pub mod history;
pub mod reactive;
pub mod scheduler;
pub mod storage;

pub use config::GemConfig;
pub use error::{GemError, Result};
