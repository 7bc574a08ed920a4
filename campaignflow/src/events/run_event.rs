use crate::core::RunStatus;
use serde::Serialize;

/// A lifecycle event of one submitted run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// The graph was accepted by the backend.
    #[serde(rename = "run.submitted")]
    Submitted {
        /// Workflow name.
        workflow: String,
        /// Submission handle.
        handle: String,
        /// Graph fingerprint.
        fingerprint: String,
    },
    /// A poll observed a new status.
    #[serde(rename = "run.status_changed")]
    StatusChanged {
        /// Submission handle.
        handle: String,
        /// Previous status.
        from: RunStatus,
        /// Observed status.
        to: RunStatus,
        /// Poll number, starting at 1.
        poll: u32,
    },
    /// The run succeeded and its result was retrieved.
    #[serde(rename = "run.completed")]
    Completed {
        /// Submission handle.
        handle: String,
        /// Final artifact location.
        artifact: Option<String>,
        /// Number of polls.
        polls: u32,
        /// Wall-clock time since submission.
        elapsed_ms: f64,
    },
    /// The run failed on the backend.
    #[serde(rename = "run.failed")]
    Failed {
        /// Submission handle.
        handle: String,
        /// Failure description.
        reason: String,
    },
    /// The maximum wait elapsed before a terminal status.
    #[serde(rename = "run.timed_out")]
    TimedOut {
        /// Submission handle.
        handle: String,
        /// Time waited.
        waited_ms: f64,
    },
    /// The caller cancelled the wait.
    #[serde(rename = "run.cancelled")]
    Cancelled {
        /// Submission handle.
        handle: String,
        /// Cancellation reason.
        reason: Option<String>,
    },
}

impl RunEvent {
    /// Returns the dotted event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "run.submitted",
            Self::StatusChanged { .. } => "run.status_changed",
            Self::Completed { .. } => "run.completed",
            Self::Failed { .. } => "run.failed",
            Self::TimedOut { .. } => "run.timed_out",
            Self::Cancelled { .. } => "run.cancelled",
        }
    }

    /// Returns the submission handle the event belongs to.
    #[must_use]
    pub fn handle(&self) -> &str {
        match self {
            Self::Submitted { handle, .. }
            | Self::StatusChanged { handle, .. }
            | Self::Completed { handle, .. }
            | Self::Failed { handle, .. }
            | Self::TimedOut { handle, .. }
            | Self::Cancelled { handle, .. } => handle,
        }
    }
}
