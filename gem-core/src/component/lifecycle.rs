//! Element lifecycle states.

use std::fmt;

/// Where an element is in its life.
///
/// ```text
/// Constructed -> WillMount -> Mounted -> Unmounted
///                    ^                      |
///                    +------ reconnect -----+
/// ```
///
/// Re-renders after mounting do not change the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Built, not yet connected.
    Constructed,
    /// Connected; the first render has not completed.
    WillMount,
    /// First render done; updates are live.
    Mounted,
    /// Disconnected; attribute changes are ignored.
    Unmounted,
}

impl Lifecycle {
    pub fn is_mounted(self) -> bool {
        self == Lifecycle::Mounted
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Constructed => "constructed",
            Lifecycle::WillMount => "will-mount",
            Lifecycle::Mounted => "mounted",
            Lifecycle::Unmounted => "unmounted",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
