//! Backend and run status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status reported by the backend runtime for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    /// Accepted but not started.
    Pending,
    /// At least one stage is executing.
    Running,
    /// Every stage finished successfully.
    Succeeded,
    /// Some stage failed.
    Failed,
}

impl BackendStatus {
    /// Returns true if the backend will not change this status again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Status of a run as seen by the execution driver.
///
/// Extends [`BackendStatus`] with the two ways the driver can stop waiting
/// on its own. Neither of them stops the job on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Submitted, not started.
    #[default]
    Pending,
    /// Executing.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished with a failure.
    Failed,
    /// The driver's maximum wait elapsed first.
    TimedOut,
    /// The caller cancelled the wait.
    Cancelled,
}

impl RunStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl From<BackendStatus> for RunStatus {
    fn from(status: BackendStatus) -> Self {
        match status {
            BackendStatus::Pending => Self::Pending,
            BackendStatus::Running => Self::Running,
            BackendStatus::Succeeded => Self::Succeeded,
            BackendStatus::Failed => Self::Failed,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_status_is_terminal() {
        assert!(BackendStatus::Succeeded.is_terminal());
        assert!(BackendStatus::Failed.is_terminal());
        assert!(!BackendStatus::Pending.is_terminal());
        assert!(!BackendStatus::Running.is_terminal());
    }

    #[test]
    fn test_run_status_is_terminal() {
        assert!(RunStatus::TimedOut.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Succeeded.is_success());
        assert!(!RunStatus::TimedOut.is_success());
    }

    #[test]
    fn test_run_status_from_backend() {
        assert_eq!(RunStatus::from(BackendStatus::Failed), RunStatus::Failed);
        assert_eq!(RunStatus::from(BackendStatus::Pending), RunStatus::Pending);
    }

    #[test]
    fn test_run_status_serialize() {
        let json = serde_json::to_string(&RunStatus::TimedOut).unwrap();
        assert_eq!(json, r#""timed_out""#);
    }
}
