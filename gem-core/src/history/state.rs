//! Navigation state objects.
//!
//! Every history entry carries a [`HistoryState`]: a unique [`StateKey`],
//! flags recording which handlers were attached when it was created, and
//! whatever data the application passed. The flags survive a reload through
//! the native history; the handlers themselves do not.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GemError, Result};

/// Data keys owned by the history bookkeeping.
pub const RESERVED_KEYS: [&str; 5] = [
    "$key",
    "$close",
    "$hasCloseHandle",
    "$hasOpenHandle",
    "$hasShouldCloseHandle",
];

/// Unique, ordered identifier of a history entry.
///
/// A millisecond timestamp plus a process-wide sequence number, so two keys
/// created in the same millisecond still differ. Serialized as `"ms-seq"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    timestamp_ms: u64,
    seq: u64,
}

impl StateKey {
    pub fn generate() -> Self {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self {
            timestamp_ms,
            seq: SEQ.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.timestamp_ms, self.seq)
    }
}

impl FromStr for StateKey {
    type Err = GemError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GemError::InvalidLocation(format!("state key {s:?}"));
        let (timestamp, seq) = s.split_once('-').ok_or_else(invalid)?;
        Ok(Self {
            timestamp_ms: timestamp.parse().map_err(|_| invalid())?,
            seq: seq.parse().map_err(|_| invalid())?,
        })
    }
}

impl Serialize for StateKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StateKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// State stored with every history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
    #[serde(rename = "$key")]
    pub key: StateKey,
    #[serde(rename = "$hasCloseHandle", default)]
    pub has_close_handle: bool,
    #[serde(rename = "$hasOpenHandle", default)]
    pub has_open_handle: bool,
    #[serde(rename = "$hasShouldCloseHandle", default)]
    pub has_should_close_handle: bool,
    /// Application data.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl HistoryState {
    /// A fresh state with a new key and no handlers.
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            key: StateKey::generate(),
            has_close_handle: false,
            has_open_handle: false,
            has_should_close_handle: false,
            data,
        }
    }
}

/// Reject application data that collides with bookkeeping keys.
pub fn validate_data(data: &Map<String, Value>) -> Result<()> {
    match RESERVED_KEYS.iter().find(|key| data.contains_key(**key)) {
        Some(key) => Err(GemError::ReservedStateKey((*key).to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_unique_and_increasing() {
        let a = StateKey::generate();
        let b = StateKey::generate();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn key_string_round_trip() {
        let key = StateKey::generate();
        let parsed: StateKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert!("nope".parse::<StateKey>().is_err());
        assert!("1-x".parse::<StateKey>().is_err());
    }

    #[test]
    fn state_serializes_with_reserved_names() {
        let mut state = HistoryState::new(json!({ "modal": true }).as_object().unwrap().clone());
        state.has_close_handle = true;

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["$hasCloseHandle"], json!(true));
        assert_eq!(value["$hasOpenHandle"], json!(false));
        assert_eq!(value["modal"], json!(true));
        assert_eq!(value["$key"], json!(state.key.to_string()));

        let back: HistoryState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn reserved_keys_are_rejected() {
        for key in RESERVED_KEYS {
            let mut data = Map::new();
            data.insert(key.to_string(), json!(1));
            assert!(matches!(
                validate_data(&data),
                Err(GemError::ReservedStateKey(k)) if k == key
            ));
        }
        let mut data = Map::new();
        data.insert("$open".into(), json!(1));
        assert!(validate_data(&data).is_ok());
    }
}
