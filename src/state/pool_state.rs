/// Lifecycle state definitions for the worker pool
///
/// This module defines the states a pool moves through during a walk.
use std::fmt;

/// Represents the lifecycle state of a worker pool
///
/// States only ever move forward: `Running -> Draining -> Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolState {
    /// Accepting and executing new batches
    Running,

    /// No longer admitting batches; already admitted work still finishes
    Draining,

    /// All admitted work finished and the result stream is closed
    Terminated,
}

impl PoolState {
    /// Returns true if new batches are admitted in this state
    pub fn accepts_work(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if this is the final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Returns true if moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: PoolState) -> bool {
        next > *self
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
