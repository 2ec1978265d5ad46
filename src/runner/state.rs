//! Lifecycle states of a loop runner.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of a `LoopRunner`.
///
/// Transitions run strictly forward:
/// `Uninitialized -> Initialized -> Running -> Stopping -> Stopped`.
/// `Stopping` is only observable while a `stop` call is joining the worker.
/// `Poisoned` is entered instead of `Stopped` when the worker could not be
/// spawned or joined; like `Stopped` it is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    /// Allocated, no runtime yet
    Uninitialized,
    /// Runtime and stop signal created, no worker thread
    Initialized,
    /// Worker thread is driving the loop
    Running,
    /// Stop signal sent, join in progress
    Stopping,
    /// Worker thread has exited
    Stopped,
    /// Worker thread failed to spawn or join; the runner cannot be reused
    Poisoned,
}

impl LoopState {
    /// Check if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Stopped | LoopState::Poisoned)
    }

    /// Check if work may be queued onto the loop
    pub fn accepts_work(&self) -> bool {
        matches!(self, LoopState::Initialized | LoopState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Uninitialized => "uninitialized",
            LoopState::Initialized => "initialized",
            LoopState::Running => "running",
            LoopState::Stopping => "stopping",
            LoopState::Stopped => "stopped",
            LoopState::Poisoned => "poisoned",
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
