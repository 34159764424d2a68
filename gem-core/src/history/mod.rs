//! Navigation
//!
//! A typed navigation stack kept in step with a browser-like session
//! history, with per-entry open/close handlers and session persistence.
//!
//! ```text
//! History::push ──► NativeHistory::push_state
//!      │
//!      ├──► HistoryStack (list, currentIndex) ──► Store ──► subscribers
//!      └──► handler table (StateKey → close/open/should_close)
//!
//! NativeHistory::go ──► History::handle_popstate ──► PopOutcome
//! ```

mod native;
mod navigation;
mod query;
mod stack;
mod state;

pub use native::{MemoryNativeHistory, NativeHistory, PopState};
pub use navigation::{
    Handler, History, Location, NavigationParams, PopOutcome, ShouldCloseHandler,
};
pub use query::{absolute_location, QueryString};
pub use stack::{HistoryEntry, HistoryStack};
pub use state::{validate_data, HistoryState, StateKey, RESERVED_KEYS};
