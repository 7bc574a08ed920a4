//! The backend runtime boundary.
//!
//! The execution driver needs four operations from the runtime that executes
//! a graph, plus an optional release of finished submissions. [`LocalBackend`]
//! provides them in-process on tokio.

mod local;

pub use local::{LocalBackend, StageInvocation, StageRunner};

use crate::core::{ArtifactRef, BackendStatus, StageOutputs};
use crate::errors::BackendError;
use crate::graph::StageGraph;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Opaque identifier of a submitted graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionHandle(String);

impl SubmissionHandle {
    /// Wraps a backend-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A runtime that executes stage graphs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Submits a graph for execution.
    async fn submit(&self, graph: &StageGraph) -> Result<SubmissionHandle, BackendError>;

    /// Returns the current status of a submission.
    async fn query_status(&self, handle: &SubmissionHandle) -> Result<BackendStatus, BackendError>;

    /// Returns the named outputs a stage produced.
    async fn query_stage_outputs(
        &self,
        handle: &SubmissionHandle,
        stage: &str,
    ) -> Result<StageOutputs, BackendError>;

    /// Retrieves an artifact to a local path.
    async fn fetch_artifact(
        &self,
        handle: &SubmissionHandle,
        artifact: &ArtifactRef,
    ) -> Result<PathBuf, BackendError>;

    /// Drops the state kept for a finished submission.
    ///
    /// Backends that keep nothing per submission need not override this.
    async fn release(&self, _handle: &SubmissionHandle) -> Result<(), BackendError> {
        Ok(())
    }
}
