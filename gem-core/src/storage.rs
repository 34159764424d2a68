//! Session storage.
//!
//! [`SessionStorage`] is the raw string key/value store the platform offers;
//! [`JsonStorage`] layers JSON encoding and a read cache on top of it.
//! Malformed values are removed on read instead of surfacing an error, so a
//! corrupted entry costs one lost value and never a failed start-up.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// A string key/value store scoped to the browsing session.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
}

/// In-process [`SessionStorage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.items.lock().insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        self.items.lock().remove(key);
    }
}

/// JSON values over a [`SessionStorage`], cached after the first read.
pub struct JsonStorage {
    backend: Arc<dyn SessionStorage>,
    cache: Mutex<HashMap<String, Value>>,
}

impl JsonStorage {
    pub fn new(backend: Arc<dyn SessionStorage>) -> Self {
        Self {
            backend,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn SessionStorage> {
        &self.backend
    }

    /// Read and decode `key`. Undecodable values are removed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cached = self.cache.lock().get(key).cloned();
        let value = match cached {
            Some(value) => value,
            None => {
                let raw = self.backend.get_item(key)?;
                match serde_json::from_str::<Value>(&raw) {
                    Ok(value) => {
                        self.cache.lock().insert(key.to_string(), value.clone());
                        value
                    }
                    Err(err) => {
                        tracing::warn!(key, error = %err, "removing malformed storage entry");
                        self.backend.remove_item(key);
                        return None;
                    }
                }
            }
        };
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                tracing::warn!(key, error = %err, "removing storage entry of unexpected shape");
                self.remove(key);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let raw = serde_json::to_string(&value)?;
        self.backend.set_item(key, &raw);
        self.cache.lock().insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        self.cache.lock().remove(key);
        self.backend.remove_item(key);
    }
}

impl std::fmt::Debug for JsonStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStorage")
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}
