use crate::backend::SubmissionHandle;
use crate::core::{ArtifactRef, RunStatus};
use crate::errors::ExecutionFailure;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// The final Post artifact of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalArtifact {
    /// Slot the artifact was read from.
    pub reference: ArtifactRef,
    /// Where the backend delivered it.
    pub local_path: PathBuf,
}

/// Outcome of one driven run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    /// Terminal status.
    pub status: RunStatus,
    /// Submission handle.
    pub handle: SubmissionHandle,
    /// Fingerprint of the submitted graph.
    pub fingerprint: String,
    /// Present only when the run succeeded.
    pub final_artifact: Option<FinalArtifact>,
    /// Number of status queries.
    pub polls: u32,
    /// Submission time.
    pub started_at: DateTime<Utc>,
    /// Time the driver stopped waiting.
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Converts any status but `Succeeded` into an error.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionFailure` carrying the handle and terminal status.
    pub fn into_result(self) -> Result<Self, ExecutionFailure> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ExecutionFailure {
                handle: self.handle.to_string(),
                status: self.status,
            })
        }
    }
}
