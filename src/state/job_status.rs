//! Job status definitions for tracking crawl-job lifecycle
//!
//! A job moves strictly forward through
//! `INITIATED → RUNNING → SHUTDOWN_INITIATED → {TERMINATED | COMPLETED}`,
//! with `CORRUPTED` reachable only from `INITIATED`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current status of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    // ===== Active States =====
    /// Registered by the control surface, not yet picked up by a worker
    Initiated,

    /// Frontier and task registry exist; tasks are being scheduled
    Running,

    /// Shutdown protocol in progress
    ShutdownInitiated,

    // ===== Terminal States =====
    /// Stopped on request before running out of work
    Terminated,

    /// Ran out of work and shut itself down
    Completed,

    /// The worker could not build the job's execution context
    Corrupted,
}

impl JobStatus {
    /// Returns true if this is a terminal status (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated | Self::Completed | Self::Corrupted)
    }

    /// Returns true once shutdown has begun or the job is closed
    ///
    /// New cancellable work is refused in these statuses.
    pub fn is_closing(&self) -> bool {
        matches!(self, Self::ShutdownInitiated) || self.is_terminal()
    }

    /// Returns true if the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Initiated, Self::Running)
                | (Self::Initiated, Self::Corrupted)
                | (Self::Running, Self::ShutdownInitiated)
                | (Self::ShutdownInitiated, Self::Terminated)
                | (Self::ShutdownInitiated, Self::Completed)
        )
    }

    /// Converts the status to its wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "INITIATED",
            Self::Running => "RUNNING",
            Self::ShutdownInitiated => "SHUTDOWN_INITIATED",
            Self::Terminated => "TERMINATED",
            Self::Completed => "COMPLETED",
            Self::Corrupted => "CORRUPTED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
