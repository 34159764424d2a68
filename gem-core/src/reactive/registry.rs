//! Named store registry.
//!
//! Applications that want shared stores register them here and hand the
//! registry (or individual stores) to the elements that need them, instead of
//! reaching for process-wide statics.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use super::store::Store;
use crate::error::{GemError, Result};

/// A set of stores addressed by name.
#[derive(Debug, Default)]
pub struct StoreRegistry {
    stores: DashMap<String, Store>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one store per top-level key of `set`.
    ///
    /// Every value must itself be an object.
    pub fn from_set(set: Value) -> Result<Self> {
        let registry = Self::new();
        match set {
            Value::Object(map) => {
                for (name, initial) in map {
                    registry.create(name, initial)?;
                }
                Ok(registry)
            }
            other => Err(GemError::not_an_object(&other)),
        }
    }

    /// Create and register a store under `name`.
    pub fn create(&self, name: impl Into<String>, initial: Value) -> Result<Store> {
        match self.stores.entry(name.into()) {
            Entry::Occupied(entry) => Err(GemError::DuplicateStore(entry.key().clone())),
            Entry::Vacant(entry) => {
                let store = Store::new(initial)?;
                tracing::debug!(name = %entry.key(), store = %store.id(), "store registered");
                entry.insert(store.clone());
                Ok(store)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Store> {
        self.stores.get(name).map(|store| store.clone())
    }

    pub fn remove(&self, name: &str) -> Option<Store> {
        self.stores.remove(name).map(|(_, store)| store)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
