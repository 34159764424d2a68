//! Runtime configuration.
//!
//! Every field has a default matching browser behaviour, so an empty JSON
//! object is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Session storage key used to persist the navigation stack.
pub const DEFAULT_STORAGE_KEY: &str = "gem@historyStateList";

/// Default per-frame render budget in milliseconds.
pub const DEFAULT_FRAME_BUDGET_MS: u64 = 16;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GemConfig {
    pub scheduler: SchedulerConfig,
    pub history: HistoryConfig,
}

impl GemConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}

/// Render scheduler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Time a single frame may spend draining render tasks.
    pub frame_budget_ms: u64,
}

impl SchedulerConfig {
    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.frame_budget_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_budget_ms: DEFAULT_FRAME_BUDGET_MS,
        }
    }
}

/// Navigation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Prefix prepended to every path written to the native history.
    pub base_path: String,

    /// Session storage key for the persisted stack.
    pub storage_key: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}
