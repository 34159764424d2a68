//! The in-memory navigation stack.

use serde::{Deserialize, Serialize};

use super::query::QueryString;
use super::state::{HistoryState, StateKey};

/// One navigation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub path: String,
    #[serde(default)]
    pub query: QueryString,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub title: String,
    pub state: HistoryState,
}

impl HistoryEntry {
    /// `path + query + hash`, without any base path.
    pub fn href(&self) -> String {
        format!("{}{}{}", self.path, self.query, self.hash)
    }

    pub fn key(&self) -> StateKey {
        self.state.key
    }
}

/// The list of entries plus the index of the current one.
///
/// Serializes as `{ "list": [...], "currentIndex": n }`, which is also the
/// shape persisted to session storage and published to the history store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStack {
    list: Vec<HistoryEntry>,
    #[serde(rename = "currentIndex")]
    current_index: usize,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.list
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.list.get(self.current_index)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// `true` when the index points at an entry. A restored stack that fails
    /// this check is discarded.
    pub fn is_consistent(&self) -> bool {
        self.current_index < self.list.len()
    }

    pub fn position(&self, key: &StateKey) -> Option<usize> {
        self.list.iter().position(|entry| entry.state.key == *key)
    }

    /// Drop everything after the current entry, then append `entry` and make
    /// it current. Returns the dropped entries.
    pub fn push(&mut self, entry: HistoryEntry) -> Vec<HistoryEntry> {
        let keep = if self.list.is_empty() {
            0
        } else {
            self.current_index + 1
        };
        let removed = self.list.split_off(keep.min(self.list.len()));
        self.list.push(entry);
        self.current_index = self.list.len() - 1;
        removed
    }

    /// Substitute the current entry. On an empty stack this pushes.
    pub fn replace(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        match self.list.get_mut(self.current_index) {
            Some(slot) => Some(std::mem::replace(slot, entry)),
            None => {
                self.push(entry);
                None
            }
        }
    }

    /// Move the index; out-of-range indices are refused.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.list.len() {
            self.current_index = index;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn entry(path: &str) -> HistoryEntry {
        HistoryEntry {
            path: path.to_string(),
            query: QueryString::new(),
            hash: String::new(),
            title: String::new(),
            state: HistoryState::new(Map::new()),
        }
    }

    #[test]
    fn push_truncates_forward_entries() {
        let mut stack = HistoryStack::new();
        assert!(stack.push(entry("/")).is_empty());
        stack.push(entry("/a"));
        stack.push(entry("/b"));
        assert!(stack.set_current(1));

        let removed = stack.push(entry("/c"));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].path, "/b");
        let paths: Vec<_> = stack.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/a", "/c"]);
        assert_eq!(stack.current_index(), 2);
    }

    #[test]
    fn replace_substitutes_in_place() {
        let mut stack = HistoryStack::new();
        assert!(stack.replace(entry("/")).is_none());
        stack.push(entry("/a"));
        let old = stack.replace(entry("/b")).unwrap();
        assert_eq!(old.path, "/a");
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.current().unwrap().path, "/b");
    }

    #[test]
    fn set_current_rejects_out_of_range() {
        let mut stack = HistoryStack::new();
        stack.push(entry("/"));
        assert!(!stack.set_current(3));
        assert_eq!(stack.current_index(), 0);
    }

    #[test]
    fn serialized_shape() {
        let mut stack = HistoryStack::new();
        stack.push(entry("/a"));
        let value = serde_json::to_value(&stack).unwrap();
        assert_eq!(value["currentIndex"], json!(0));
        assert_eq!(value["list"][0]["path"], json!("/a"));
        assert_eq!(value["list"][0]["query"], json!(""));

        let back: HistoryStack = serde_json::from_value(value).unwrap();
        assert_eq!(back, stack);
        assert!(back.is_consistent());
    }

    #[test]
    fn inconsistent_index_detected() {
        let stack: HistoryStack =
            serde_json::from_value(json!({ "list": [], "currentIndex": 2 })).unwrap();
        assert!(!stack.is_consistent());
    }
}
