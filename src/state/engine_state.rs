//! Lifecycle states of a crawl engine
//!
//! An engine moves strictly forward: `Idle -> Running -> Draining -> Done`.
use std::fmt;

/// Represents the current phase of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Created, no seed accepted yet
    Idle,

    /// Fetch workers are dispatching targets from the frontier
    Running,

    /// Frontier is closed; in-flight fetches are being allowed to finish
    Draining,

    /// Terminal; the engine accepts no further work
    Done,
}

impl EngineState {
    /// Returns true if the engine has finished and cannot be started again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: EngineState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Done)
        )
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
