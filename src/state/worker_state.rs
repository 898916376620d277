/// Worker state definitions for tracking crawl progress
///
/// Each worker thread moves through these states once per URL.
use std::fmt;

/// Represents what a worker thread is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkerState {
    /// Waiting to pull the next URL from the frontier
    #[default]
    Idle,

    /// Waiting on politeness or downloading the page
    Fetching,

    /// Running the duplicate, size, type and date checks
    Filtering,

    /// Extracting words and links and feeding the frontier
    Extracting,

    /// Stopped because the frontier drained or shutdown was requested
    Stopped,
}

impl WorkerState {
    /// Returns true if the worker will not process any more URLs
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true if `next` is a legal successor of this state
    ///
    /// Any live state may fall back to `Idle` (a URL was rejected or failed)
    /// or move to `Stopped`; otherwise states advance in pipeline order.
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        match (self, next) {
            (Stopped, _) => false,
            (_, Stopped) | (_, Idle) => true,
            (Idle, Fetching) => true,
            (Fetching, Filtering) => true,
            (Filtering, Extracting) => true,
            _ => false,
        }
    }

    /// Short lowercase name used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Filtering => "filtering",
            Self::Extracting => "extracting",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
