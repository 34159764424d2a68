//! History Implementation
//!
//! [`History`] keeps an in-memory [`HistoryStack`] in step with a
//! [`NativeHistory`] and publishes every change into an observable
//! [`Store`], so elements can connect to navigation like any other state.
//!
//! # How Navigation Works
//!
//! 1. `push`/`replace` build an entry with a fresh [`StateKey`], write it to
//!    the native history and then to the stack. Handlers passed with the
//!    entry are kept in a table keyed by that `StateKey`; only their presence
//!    is recorded in the entry's state.
//! 2. `back`/`forward`/`go` move the native history. The popstate it reports
//!    is matched against the stack by key in [`History::handle_popstate`],
//!    which runs open, should-close and close handlers before moving the
//!    current index.
//! 3. Entries truncated by a push, or replaced, take their handlers with
//!    them.
//!
//! The stack survives a reload through [`History::persist`] and session
//! storage. Handlers do not; an entry whose close handler is gone is left
//! by navigating back.
//!
//! No lock is held while a handler or store subscriber runs, so both may
//! navigate again.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};
use serde_json::{json, Map, Value};

use super::native::{MemoryNativeHistory, NativeHistory};
use super::query::{resolve, split_url, QueryString};
use super::stack::{HistoryEntry, HistoryStack};
use super::state::{validate_data, HistoryState, StateKey};
use crate::config::HistoryConfig;
use crate::error::{GemError, Result};
use crate::reactive::Store;
use crate::storage::{JsonStorage, SessionStorage};

/// Called when an entry is opened or closed by navigation.
pub type Handler = Arc<dyn Fn() + Send + Sync>;

/// Asked before leaving an entry; `false` keeps the user where they are.
pub type ShouldCloseHandler = Arc<dyn Fn() -> bool + Send + Sync>;

/// What to navigate to. Unset fields default from the current location.
#[derive(Clone, Default)]
pub struct NavigationParams {
    pub path: Option<String>,
    pub query: Option<QueryString>,
    pub hash: Option<String>,
    pub title: Option<String>,
    /// Application data; must be a JSON object or `null`.
    pub data: Value,
    pub close: Option<Handler>,
    pub open: Option<Handler>,
    pub should_close: Option<ShouldCloseHandler>,
}

impl NavigationParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigate to `path`, absolute or relative to the current path.
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn query(mut self, query: impl Into<QueryString>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.close = Some(Arc::new(f));
        self
    }

    pub fn on_open<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.open = Some(Arc::new(f));
        self
    }

    pub fn should_close<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.should_close = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for NavigationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationParams")
            .field("path", &self.path)
            .field("query", &self.query)
            .field("hash", &self.hash)
            .field("title", &self.title)
            .field("data", &self.data)
            .field("close", &self.close.is_some())
            .field("open", &self.open.is_some())
            .field("should_close", &self.should_close.is_some())
            .finish()
    }
}

/// The current location.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub path: String,
    pub query: QueryString,
    pub hash: String,
    pub title: String,
    pub state: Option<HistoryState>,
    /// `path + query + hash`, without the base path.
    pub href: String,
}

impl Location {
    fn root() -> Self {
        Self {
            path: "/".to_string(),
            query: QueryString::new(),
            hash: String::new(),
            title: String::new(),
            state: None,
            href: "/".to_string(),
        }
    }
}

impl From<&HistoryEntry> for Location {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            path: entry.path.clone(),
            query: entry.query.clone(),
            hash: entry.hash.clone(),
            title: entry.title.clone(),
            state: Some(entry.state.clone()),
            href: entry.href(),
        }
    }
}

/// How a popstate was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopOutcome {
    /// The popped entry had no state; the first known entry was pushed again.
    Resynced,
    /// No entry has the popped key; the current index was kept.
    Unmatched,
    /// A should-close handler refused; the native history was moved back.
    Blocked,
    /// The current index now points at the popped entry.
    Moved { index: usize },
    /// The native history could not move by the requested delta.
    Ignored,
}

#[derive(Clone, Default)]
struct Handlers {
    close: Option<Handler>,
    open: Option<Handler>,
    should_close: Option<ShouldCloseHandler>,
}

impl Handlers {
    fn is_empty(&self) -> bool {
        self.close.is_none() && self.open.is_none() && self.should_close.is_none()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Write {
    Push,
    Replace,
}

/// Navigation stack mirrored onto a [`NativeHistory`].
pub struct History<N: NativeHistory = MemoryNativeHistory> {
    native: Mutex<N>,
    stack: RwLock<HistoryStack>,
    handlers: Mutex<HashMap<StateKey, Handlers>>,
    store: Store,
    storage: JsonStorage,
    storage_key: String,
    base_path: RwLock<String>,
}

impl<N: NativeHistory> History<N> {
    /// Attach to `native`, restoring the stack persisted in `storage`.
    ///
    /// A native entry without state (first visit, or a URL typed by the
    /// user) is recorded as a new entry. A native entry flagged with a
    /// close handler (the page was reloaded while a modal was open) is
    /// left by navigating back.
    pub fn new(native: N, storage: Arc<dyn SessionStorage>, config: &HistoryConfig) -> Result<Self> {
        let storage = JsonStorage::new(storage);
        let restored = storage
            .get::<HistoryStack>(&config.storage_key)
            .filter(HistoryStack::is_consistent)
            .unwrap_or_default();
        let native_state = native.state();

        let history = Self {
            native: Mutex::new(native),
            stack: RwLock::new(restored),
            handlers: Mutex::new(HashMap::new()),
            store: Store::new(json!({ "list": [], "currentIndex": 0 }))?,
            storage,
            storage_key: config.storage_key.clone(),
            base_path: RwLock::new(normalize_base(&config.base_path)),
        };

        match native_state {
            None => {
                let url = history.native.lock().url();
                let (path, query, hash) = split_url(&history.strip_base(&url));
                let params = NavigationParams::to(path).query(query).hash(hash);
                let (entry, handlers) = history.prepare(params)?;
                let stack_write = if history.stack.read().is_empty() {
                    Write::Replace
                } else {
                    Write::Push
                };
                history.record(entry, handlers, Write::Replace, stack_write)?;
            }
            Some(state) => {
                let position = history.stack.read().position(&state.key);
                match position {
                    Some(index) => {
                        history.stack.write().set_current(index);
                    }
                    None => {
                        let url = history.native.lock().url();
                        let (path, query, hash) = split_url(&history.strip_base(&url));
                        history.stack.write().push(HistoryEntry {
                            path,
                            query,
                            hash,
                            title: String::new(),
                            state: state.clone(),
                        });
                    }
                }
                history.publish()?;
                if state.has_close_handle {
                    tracing::debug!(key = %state.key, "reloaded on a closable entry, going back");
                    history.back()?;
                }
            }
        }
        Ok(history)
    }

    /// Append an entry after the current one.
    pub fn push(&self, params: NavigationParams) -> Result<()> {
        let (entry, handlers) = self.prepare(params)?;
        tracing::debug!(href = %entry.href(), key = %entry.key(), "history push");
        self.record(entry, handlers, Write::Push, Write::Push)
    }

    /// Substitute the current entry.
    pub fn replace(&self, params: NavigationParams) -> Result<()> {
        let (entry, handlers) = self.prepare(params)?;
        tracing::debug!(href = %entry.href(), key = %entry.key(), "history replace");
        self.record(entry, handlers, Write::Replace, Write::Replace)
    }

    /// [`push`](Self::push) keeping the current path and query unless given.
    pub fn push_state(&self, params: NavigationParams) -> Result<()> {
        self.push(self.with_current_location(params))
    }

    /// [`replace`](Self::replace) keeping the current path and query unless given.
    pub fn replace_state(&self, params: NavigationParams) -> Result<()> {
        self.replace(self.with_current_location(params))
    }

    /// Navigate away from a closable entry without stacking on top of it:
    /// its close handler runs and the entry is replaced.
    pub fn push_ignore_close_handle(&self, params: NavigationParams) -> Result<()> {
        let current = self.stack.read().current().map(|entry| entry.state.clone());
        match current.filter(|state| state.has_close_handle) {
            Some(state) => {
                if let Some(close) = self.handlers_for(&state.key).and_then(|h| h.close) {
                    close();
                }
                self.replace(params)
            }
            None => self.push(params),
        }
    }

    pub fn back(&self) -> Result<PopOutcome> {
        self.go(-1)
    }

    pub fn forward(&self) -> Result<PopOutcome> {
        self.go(1)
    }

    /// Move the native history by `delta` and handle the resulting popstate.
    pub fn go(&self, delta: i64) -> Result<PopOutcome> {
        let pop = self.native.lock().go(delta);
        match pop {
            Some(pop) => self.handle_popstate(pop.state),
            None => {
                tracing::debug!(delta, "history cannot move");
                Ok(PopOutcome::Ignored)
            }
        }
    }

    /// React to the native history having moved to an entry with `state`.
    pub fn handle_popstate(&self, state: Option<HistoryState>) -> Result<PopOutcome> {
        let Some(state) = state else {
            let first = self.stack.read().entries().first().cloned();
            if let Some(first) = first {
                let url = self.url_for(&first);
                self.native.lock().push_state(first.state, &first.title, &url);
            }
            tracing::debug!("popstate without state, resynced native history");
            return Ok(PopOutcome::Resynced);
        };

        let (target, current_index, leaving) = {
            let stack = self.stack.read();
            (
                stack.position(&state.key),
                stack.current_index(),
                stack.current().map(|entry| entry.state.clone()),
            )
        };
        let Some(target) = target else {
            tracing::warn!(key = %state.key, "popstate for an unknown entry");
            return Ok(PopOutcome::Unmatched);
        };

        let is_forward = target > current_index;
        let mut keep_going_back = false;
        if is_forward && state.has_open_handle {
            if let Some(open) = self.handlers_for(&state.key).and_then(|h| h.open) {
                open();
            }
        } else if let Some(leaving) = leaving.filter(|s| s.has_close_handle) {
            let handlers = self.handlers_for(&leaving.key).unwrap_or_default();
            if let Some(should_close) = handlers.should_close {
                if !should_close() {
                    let restore = offset(target, current_index);
                    self.native.lock().go(restore);
                    tracing::debug!(key = %leaving.key, "close refused, navigation reverted");
                    return Ok(PopOutcome::Blocked);
                }
            }
            match handlers.close {
                Some(close) => close(),
                None => keep_going_back = state.has_close_handle,
            }
        }

        self.stack.write().set_current(target);
        self.publish()?;
        tracing::debug!(index = target, key = %state.key, "history moved");

        if keep_going_back {
            let outcome = self.back()?;
            if outcome != PopOutcome::Ignored {
                return Ok(outcome);
            }
        }
        Ok(PopOutcome::Moved { index: target })
    }

    pub fn location(&self) -> Location {
        self.stack
            .read()
            .current()
            .map(Location::from)
            .unwrap_or_else(Location::root)
    }

    /// Observable mirror of the stack: `{ "list": [...], "currentIndex": n }`.
    pub fn history_state(&self) -> &Store {
        &self.store
    }

    pub fn stack(&self) -> HistoryStack {
        self.stack.read().clone()
    }

    /// Write the stack to session storage.
    pub fn persist(&self) -> Result<()> {
        self.storage.set(&self.storage_key, &*self.stack.read())
    }

    pub fn base_path(&self) -> String {
        self.base_path.read().clone()
    }

    pub fn set_base_path(&self, base_path: &str) {
        *self.base_path.write() = normalize_base(base_path);
    }

    /// Number of entries that still have handlers attached.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn native(&self) -> MutexGuard<'_, N> {
        self.native.lock()
    }

    pub fn into_native(self) -> N {
        self.native.into_inner()
    }

    fn prepare(&self, params: NavigationParams) -> Result<(HistoryEntry, Handlers)> {
        let data = match params.data {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => return Err(GemError::not_an_object(&other)),
        };
        validate_data(&data)?;

        let current = self.stack.read().current().cloned();
        let current_path = current
            .as_ref()
            .map(|entry| entry.path.clone())
            .unwrap_or_else(|| "/".to_string());

        let (path, query, hash) = match params.path {
            Some(path) => {
                let url = resolve(&current_path, &path)?;
                let query = params
                    .query
                    .unwrap_or_else(|| url.query().map(QueryString::parse).unwrap_or_default());
                let hash = params
                    .hash
                    .or_else(|| url.fragment().map(str::to_string))
                    .unwrap_or_default();
                (url.path().to_string(), query, hash)
            }
            None => {
                let query = params
                    .query
                    .or_else(|| current.as_ref().map(|entry| entry.query.clone()))
                    .unwrap_or_default();
                let hash = params
                    .hash
                    .or_else(|| current.as_ref().map(|entry| entry.hash.clone()))
                    .unwrap_or_default();
                (current_path.clone(), query, hash)
            }
        };
        let title = params.title.unwrap_or_else(|| match &current {
            Some(entry) if entry.path == path => entry.title.clone(),
            _ => String::new(),
        });

        let mut state = HistoryState::new(data);
        state.has_close_handle = params.close.is_some();
        state.has_open_handle = params.open.is_some();
        state.has_should_close_handle = params.should_close.is_some();

        let entry = HistoryEntry {
            path,
            query,
            hash: normalize_hash(hash),
            title,
            state,
        };
        let handlers = Handlers {
            close: params.close,
            open: params.open,
            should_close: params.should_close,
        };
        Ok((entry, handlers))
    }

    fn record(&self, entry: HistoryEntry, handlers: Handlers, native: Write, stack: Write) -> Result<()> {
        let url = self.url_for(&entry);
        {
            let mut history = self.native.lock();
            match native {
                Write::Push => history.push_state(entry.state.clone(), &entry.title, &url),
                Write::Replace => history.replace_state(entry.state.clone(), &entry.title, &url),
            }
        }

        let key = entry.key();
        let dropped: Vec<StateKey> = {
            let mut list = self.stack.write();
            match stack {
                Write::Push => list.push(entry).iter().map(HistoryEntry::key).collect(),
                Write::Replace => list.replace(entry).iter().map(HistoryEntry::key).collect(),
            }
        };
        {
            let mut table = self.handlers.lock();
            for key in &dropped {
                table.remove(key);
            }
            if !handlers.is_empty() {
                table.insert(key, handlers);
            }
        }
        self.publish()
    }

    fn with_current_location(&self, mut params: NavigationParams) -> NavigationParams {
        if let Some(current) = self.stack.read().current() {
            if params.path.is_none() {
                params.path = Some(current.path.clone());
                params.query = params.query.or_else(|| Some(current.query.clone()));
            }
        }
        params
    }

    fn handlers_for(&self, key: &StateKey) -> Option<Handlers> {
        self.handlers.lock().get(key).cloned()
    }

    fn publish(&self) -> Result<()> {
        let snapshot = serde_json::to_value(&*self.stack.read())?;
        self.store.update(snapshot)
    }

    fn url_for(&self, entry: &HistoryEntry) -> String {
        format!("{}{}", self.base_path.read(), entry.href())
    }

    fn strip_base(&self, url: &str) -> String {
        let base = self.base_path.read();
        match url.strip_prefix(base.as_str()) {
            Some(rest) if !base.is_empty() && rest.is_empty() => "/".to_string(),
            Some(rest) if !base.is_empty() && !rest.starts_with(['/', '?', '#']) => url.to_string(),
            Some(rest) => rest.to_string(),
            None => url.to_string(),
        }
    }
}

impl<N: NativeHistory> fmt::Debug for History<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stack = self.stack.read();
        f.debug_struct("History")
            .field("entries", &stack.len())
            .field("current_index", &stack.current_index())
            .field("base_path", &*self.base_path.read())
            .field("handlers", &self.handlers.lock().len())
            .finish()
    }
}

fn normalize_base(base_path: &str) -> String {
    base_path.trim_end_matches('/').to_string()
}

fn normalize_hash(hash: String) -> String {
    if hash.is_empty() || hash.starts_with('#') {
        hash
    } else {
        format!("#{hash}")
    }
}

/// Signed distance from `from` to `to`.
fn offset(from: usize, to: usize) -> i64 {
    let from = i64::try_from(from).unwrap_or(i64::MAX);
    let to = i64::try_from(to).unwrap_or(i64::MAX);
    to - from
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

    fn history() -> History {
        History::new(
            MemoryNativeHistory::default(),
            Arc::new(MemoryStorage::new()),
            &HistoryConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn first_visit_records_native_url() {
        let history = History::new(
            MemoryNativeHistory::new("/start?x=1#top"),
            Arc::new(MemoryStorage::new()),
            &HistoryConfig::default(),
        )
        .unwrap();

        let location = history.location();
        assert_eq!(location.path, "/start");
        assert_eq!(location.query.get("x"), Some("1"));
        assert_eq!(location.hash, "#top");
        assert_eq!(location.href, "/start?x=1#top");

        let native = history.native();
        assert_eq!(native.len(), 1);
        assert!(native.state().is_some());
        assert_eq!(native.url(), "/start?x=1#top");
    }

    #[test]
    fn push_push_back() {
        let history = history();
        history.push(NavigationParams::to("/a")).unwrap();
        history.push(NavigationParams::to("/b")).unwrap();
        assert_eq!(history.location().path, "/b");

        assert_eq!(history.back().unwrap(), PopOutcome::Moved { index: 1 });
        assert_eq!(history.location().path, "/a");
        assert_eq!(history.native().url(), "/a");

        assert_eq!(history.forward().unwrap(), PopOutcome::Moved { index: 2 });
        assert_eq!(history.location().path, "/b");
        assert_eq!(history.forward().unwrap(), PopOutcome::Ignored);
    }

    #[test]
    fn replace_keeps_length() {
        let history = history();
        history.push(NavigationParams::to("/a")).unwrap();
        history
            .replace(NavigationParams::to("/b").title("B"))
            .unwrap();

        let stack = history.stack();
        assert_eq!(stack.len(), 2);
        assert_eq!(history.location().path, "/b");
        assert_eq!(history.location().title, "B");
        assert_eq!(history.native().len(), 2);
    }

    #[test]
    fn relative_paths_resolve_against_current() {
        let history = history();
        history.push(NavigationParams::to("/a/b")).unwrap();
        history.push(NavigationParams::to("./c")).unwrap();
        assert_eq!(history.location().path, "/a/c");
        history.push(NavigationParams::to("../d?x=1")).unwrap();
        assert_eq!(history.location().path, "/d");
        assert_eq!(history.location().query.get("x"), Some("1"));
    }

    #[test]
    fn push_state_keeps_path_and_query() {
        let history = history();
        history
            .push(NavigationParams::to("/list").query("page=2"))
            .unwrap();
        history
            .push_state(NavigationParams::new().data(json!({ "open": true })))
            .unwrap();

        let location = history.location();
        assert_eq!(location.href, "/list?page=2");
        assert_eq!(location.state.unwrap().data["open"], json!(true));
        assert_eq!(history.stack().len(), 3);

        history
            .replace_state(NavigationParams::new().data(json!({ "open": false })))
            .unwrap();
        assert_eq!(history.stack().len(), 3);
        assert_eq!(history.location().href, "/list?page=2");
    }

    #[test]
    fn close_handler_runs_once_on_back() {
        let history = history();
        let closed = Arc::new(AtomicI32::new(0));
        let c = closed.clone();
        history
            .push(NavigationParams::to("/modal").on_close(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert!(history.location().state.unwrap().has_close_handle);

        history.back().unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(history.location().path, "/");
    }

    #[test]
    fn should_close_can_block() {
        let history = history();
        let closed = Arc::new(AtomicI32::new(0));
        let c = closed.clone();
        history
            .push(
                NavigationParams::to("/form")
                    .on_close(move || {
                        c.fetch_add(1, Ordering::SeqCst);
                    })
                    .should_close(|| false),
            )
            .unwrap();

        assert_eq!(history.back().unwrap(), PopOutcome::Blocked);
        assert_eq!(history.location().path, "/form");
        assert_eq!(history.native().url(), "/form");
        assert_eq!(closed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn open_handler_runs_on_forward() {
        let history = history();
        let opened = Arc::new(AtomicI32::new(0));
        let o = opened.clone();
        history
            .push(NavigationParams::to("/drawer").on_open(move || {
                o.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert_eq!(opened.load(Ordering::SeqCst), 0);

        history.back().unwrap();
        history.forward().unwrap();
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(history.location().path, "/drawer");
    }

    #[test]
    fn reserved_keys_are_rejected() {
        let history = history();
        let err = history
            .push(NavigationParams::to("/a").data(json!({ "$hasCloseHandle": true })))
            .unwrap_err();
        assert!(matches!(err, GemError::ReservedStateKey(key) if key == "$hasCloseHandle"));
        assert_eq!(history.stack().len(), 1);

        let err = history
            .push(NavigationParams::to("/a").data(json!([1])))
            .unwrap_err();
        assert!(matches!(err, GemError::NotAnObject { .. }));
    }

    #[test]
    fn truncated_entries_drop_handlers() {
        let history = history();
        history
            .push(NavigationParams::to("/modal").on_close(|| {}))
            .unwrap();
        assert_eq!(history.handler_count(), 1);

        history.back().unwrap();
        history.push(NavigationParams::to("/other")).unwrap();
        assert_eq!(history.handler_count(), 0);
        assert_eq!(history.stack().len(), 2);
    }

    #[test]
    fn push_ignore_close_handle_replaces_closable_entry() {
        let history = history();
        let closed = Arc::new(AtomicI32::new(0));
        let c = closed.clone();
        history
            .push(NavigationParams::to("/modal").on_close(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        history
            .push_ignore_close_handle(NavigationParams::to("/next"))
            .unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(history.stack().len(), 2);
        assert_eq!(history.location().path, "/next");
        assert_eq!(history.handler_count(), 0);

        history
            .push_ignore_close_handle(NavigationParams::to("/last"))
            .unwrap();
        assert_eq!(history.stack().len(), 3);
    }

    #[test]
    fn stateless_popstate_resyncs() {
        let history = history();
        history.push(NavigationParams::to("/a")).unwrap();
        let native_len = history.native().len();

        assert_eq!(history.handle_popstate(None).unwrap(), PopOutcome::Resynced);
        assert_eq!(history.stack().current_index(), 1);
        assert_eq!(history.native().url(), "/");
        assert_eq!(history.native().len(), native_len + 1);
    }

    #[test]
    fn unknown_key_keeps_index() {
        let history = history();
        history.push(NavigationParams::to("/a")).unwrap();

        let stranger = HistoryState::new(Map::new());
        assert_eq!(
            history.handle_popstate(Some(stranger)).unwrap(),
            PopOutcome::Unmatched
        );
        assert_eq!(history.stack().current_index(), 1);
    }

    #[test]
    fn store_mirrors_the_stack() {
        let history = history();
        let notified = Arc::new(AtomicUsize::new(0));
        let n = notified.clone();
        let _sub = history.history_state().subscribe(move || {
            n.fetch_add(1, Ordering::SeqCst);
        });

        history.push(NavigationParams::to("/a")).unwrap();
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(history.history_state().get("currentIndex"), Some(json!(1)));
        let list = history.history_state().get("list").unwrap();
        assert_eq!(list.as_array().unwrap().len(), 2);
        assert_eq!(list[1]["path"], json!("/a"));
    }

    #[test]
    fn base_path_prefixes_native_urls() {
        let config = HistoryConfig {
            base_path: "/app/".into(),
            ..HistoryConfig::default()
        };
        let history = History::new(
            MemoryNativeHistory::new("/app/home"),
            Arc::new(MemoryStorage::new()),
            &config,
        )
        .unwrap();
        assert_eq!(history.base_path(), "/app");
        assert_eq!(history.location().path, "/home");

        history.push(NavigationParams::to("/a")).unwrap();
        assert_eq!(history.native().url(), "/app/a");

        history.set_base_path("");
        history.push(NavigationParams::to("/b")).unwrap();
        assert_eq!(history.native().url(), "/b");
    }

    #[test]
    fn persisted_stack_survives_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let config = HistoryConfig::default();
        let history = History::new(MemoryNativeHistory::default(), storage.clone(), &config).unwrap();
        history.push(NavigationParams::to("/a")).unwrap();
        history.push(NavigationParams::to("/b")).unwrap();
        history.back().unwrap();
        history.persist().unwrap();
        let native = history.into_native();

        let reloaded = History::new(native, storage, &config).unwrap();
        assert_eq!(reloaded.stack().len(), 3);
        assert_eq!(reloaded.location().path, "/a");
        reloaded.forward().unwrap();
        assert_eq!(reloaded.location().path, "/b");
    }

    #[test]
    fn reload_on_closable_entry_goes_back() {
        let storage = Arc::new(MemoryStorage::new());
        let config = HistoryConfig::default();
        let history = History::new(MemoryNativeHistory::default(), storage.clone(), &config).unwrap();
        history.push(NavigationParams::to("/a")).unwrap();
        history
            .push(NavigationParams::to("/modal").on_close(|| {}))
            .unwrap();
        history.persist().unwrap();
        let native = history.into_native();

        let reloaded = History::new(native, storage, &config).unwrap();
        assert_eq!(reloaded.location().path, "/a");
        assert_eq!(reloaded.native().url(), "/a");
    }

    #[test]
    fn reload_on_nested_closable_entries_leaves_all_of_them() {
        let storage = Arc::new(MemoryStorage::new());
        let config = HistoryConfig::default();
        let history = History::new(MemoryNativeHistory::default(), storage.clone(), &config).unwrap();
        history.push(NavigationParams::to("/a")).unwrap();
        history
            .push(NavigationParams::to("/dialog").on_close(|| {}))
            .unwrap();
        history
            .push(NavigationParams::to("/confirm").on_close(|| {}))
            .unwrap();
        history.persist().unwrap();
        let native = history.into_native();

        let reloaded = History::new(native, storage, &config).unwrap();
        assert_eq!(reloaded.location().path, "/a");
        assert_eq!(reloaded.stack().current_index(), 1);
    }

    #[test]
    fn malformed_persisted_stack_is_ignored() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("gem@historyStateList", "{oops");
        let history = History::new(
            MemoryNativeHistory::default(),
            storage.clone(),
            &HistoryConfig::default(),
        )
        .unwrap();
        assert_eq!(history.stack().len(), 1);
        assert!(storage.get_item("gem@historyStateList").is_none());
    }

    #[test]
    fn typed_url_after_restore_is_pushed() {
        let storage = Arc::new(MemoryStorage::new());
        let config = HistoryConfig::default();
        let history = History::new(MemoryNativeHistory::default(), storage.clone(), &config).unwrap();
        history.push(NavigationParams::to("/a")).unwrap();
        history.persist().unwrap();
        let mut native = history.into_native();
        native.visit("/typed");

        let reloaded = History::new(native, storage, &config).unwrap();
        let paths: Vec<_> = reloaded
            .stack()
            .entries()
            .iter()
            .map(|entry| entry.path.clone())
            .collect();
        assert_eq!(paths, vec!["/", "/a", "/typed"]);
        reloaded.back().unwrap();
        assert_eq!(reloaded.location().path, "/a");
    }
}
