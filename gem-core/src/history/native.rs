//! The platform history the navigation stack mirrors onto.

use super::state::HistoryState;

/// The state delivered when the platform moves to another entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PopState {
    pub state: Option<HistoryState>,
}

/// A browser-like session history.
///
/// Entries created outside this crate (the very first page load, or a
/// manually typed URL) carry no state.
pub trait NativeHistory: Send {
    /// State of the current entry.
    fn state(&self) -> Option<HistoryState>;

    /// URL of the current entry, including base path, query and hash.
    fn url(&self) -> String;

    fn push_state(&mut self, state: HistoryState, title: &str, url: &str);

    fn replace_state(&mut self, state: HistoryState, title: &str, url: &str);

    /// Move by `delta` entries. Returns `None` when the move would leave
    /// the session, otherwise the popstate for the new entry.
    fn go(&mut self, delta: i64) -> Option<PopState>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct NativeEntry {
    state: Option<HistoryState>,
    title: String,
    url: String,
}

/// In-process [`NativeHistory`].
#[derive(Debug, Clone)]
pub struct MemoryNativeHistory {
    entries: Vec<NativeEntry>,
    index: usize,
}

impl MemoryNativeHistory {
    /// A session with a single stateless entry at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            entries: vec![NativeEntry {
                state: None,
                title: String::new(),
                url: url.into(),
            }],
            index: 0,
        }
    }

    /// Navigate to a URL typed by the user: a new stateless entry.
    pub fn visit(&mut self, url: impl Into<String>) {
        self.entries.truncate(self.index + 1);
        self.entries.push(NativeEntry {
            state: None,
            title: String::new(),
            url: url.into(),
        });
        self.index = self.entries.len() - 1;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn title(&self) -> &str {
        self.entries
            .get(self.index)
            .map(|entry| entry.title.as_str())
            .unwrap_or_default()
    }
}

impl Default for MemoryNativeHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl NativeHistory for MemoryNativeHistory {
    fn state(&self) -> Option<HistoryState> {
        self.entries.get(self.index).and_then(|entry| entry.state.clone())
    }

    fn url(&self) -> String {
        self.entries
            .get(self.index)
            .map(|entry| entry.url.clone())
            .unwrap_or_default()
    }

    fn push_state(&mut self, state: HistoryState, title: &str, url: &str) {
        self.entries.truncate(self.index + 1);
        self.entries.push(NativeEntry {
            state: Some(state),
            title: title.to_string(),
            url: url.to_string(),
        });
        self.index = self.entries.len() - 1;
    }

    fn replace_state(&mut self, state: HistoryState, title: &str, url: &str) {
        if let Some(entry) = self.entries.get_mut(self.index) {
            *entry = NativeEntry {
                state: Some(state),
                title: title.to_string(),
                url: url.to_string(),
            };
        }
    }

    fn go(&mut self, delta: i64) -> Option<PopState> {
        if delta == 0 {
            return None;
        }
        let target = i64::try_from(self.index).ok()?.checked_add(delta)?;
        let target = usize::try_from(target).ok()?;
        let entry = self.entries.get(target)?;
        self.index = target;
        Some(PopState {
            state: entry.state.clone(),
        })
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
