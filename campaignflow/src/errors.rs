//! Error types for campaign planning, graph building and execution.
//!
//! The taxonomy mirrors the points at which a run can stop: descriptor
//! validation and executor configuration fail before anything is submitted,
//! graph wiring defects are programming errors, and backend or execution
//! failures surface only after a submission exists.

use crate::core::{CampaignKind, ResourceTier, RunStatus};
use thiserror::Error;

/// Convenience result alias used across the crate.
pub type Result<T, E = CampaignflowError> = std::result::Result<T, E>;

/// The main error type for campaignflow operations.
#[derive(Debug, Error)]
pub enum CampaignflowError {
    /// Input descriptors were rejected before planning completed.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Executor configuration is missing or inconsistent.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The stage graph could not be assembled.
    #[error("{0}")]
    Graph(#[from] GraphError),

    /// The backend runtime could not be reached or answered inconsistently.
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// A submitted run reached a non-successful terminal status.
    #[error("{0}")]
    Execution(#[from] ExecutionFailure),

    /// Task discovery or aggregation failed.
    #[error("{0}")]
    Task(#[from] TaskError),
}

impl CampaignflowError {
    /// Returns the stable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::Configuration(e) => e.code(),
            Self::Graph(e) => e.code(),
            Self::Backend(_) => "BACKEND-001",
            Self::Execution(_) => "EXECUTION-001-FAILED",
            Self::Task(e) => e.code(),
        }
    }

    /// Returns true if repeating the same call may succeed.
    ///
    /// Only transport failures of the backend qualify. Whether to resubmit a
    /// failed run is left to the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(e) => e.is_retryable(),
            Self::Configuration(e) => e.is_retryable(),
            Self::Backend(e) => e.is_retryable(),
            Self::Graph(_) | Self::Execution(_) | Self::Task(_) => false,
        }
    }

    /// Returns true if the error was raised before any remote resource was used.
    #[must_use]
    pub fn is_pre_submission(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Configuration(_) | Self::Graph(_)
        )
    }
}

impl From<ClassificationError> for CampaignflowError {
    fn from(err: ClassificationError) -> Self {
        Self::Validation(ValidationError::Classification(err))
    }
}

/// Errors raised while validating the input descriptors of a run.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Zero or more than two descriptors were supplied.
    #[error("Between 1 and 2 descriptors required, got {count}")]
    InvalidArgumentCount {
        /// Number of descriptors supplied.
        count: usize,
    },

    /// Two descriptors classified to the same campaign kind.
    #[error("Both descriptors describe a {kind} campaign")]
    DuplicateCampaignKind {
        /// The shared campaign kind.
        kind: CampaignKind,
    },

    /// A descriptor could not be classified.
    #[error("{0}")]
    Classification(#[from] ClassificationError),
}

impl ValidationError {
    /// Returns the stable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgumentCount { .. } => "VALIDATION-001-ARG_COUNT",
            Self::DuplicateCampaignKind { .. } => "VALIDATION-002-DUPLICATE_KIND",
            Self::Classification(e) => e.code(),
        }
    }

    /// Validation errors never succeed on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

/// Errors raised by a task classifier.
#[derive(Debug, Clone, Error)]
pub enum ClassificationError {
    /// The descriptor content could not be read.
    #[error("Cannot read descriptor '{descriptor}': {reason}")]
    Unreadable {
        /// Descriptor reference.
        descriptor: String,
        /// Underlying reason.
        reason: String,
    },

    /// The descriptor content is not a structured document.
    #[error("Descriptor '{descriptor}' is malformed: {reason}")]
    Malformed {
        /// Descriptor reference.
        descriptor: String,
        /// Underlying reason.
        reason: String,
    },

    /// Neither campaign marker key is present.
    #[error("Descriptor '{descriptor}' has no relax or properties marker")]
    NoMarker {
        /// Descriptor reference.
        descriptor: String,
    },

    /// Both campaign marker keys are present.
    #[error("Descriptor '{descriptor}' carries both relax and properties markers")]
    Ambiguous {
        /// Descriptor reference.
        descriptor: String,
    },
}

impl ClassificationError {
    /// Returns the stable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unreadable { .. } => "VALIDATION-010-UNREADABLE",
            Self::Malformed { .. } => "VALIDATION-011-MALFORMED",
            Self::NoMarker { .. } => "VALIDATION-012-NO_MARKER",
            Self::Ambiguous { .. } => "VALIDATION-013-AMBIGUOUS",
        }
    }
}

/// Errors in the executor configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// No profile is registered for the engine and tier.
    #[error("No executor profile registered for engine '{engine}' on {tier}")]
    UnknownProfile {
        /// Engine identifier.
        engine: String,
        /// Requested resource tier.
        tier: ResourceTier,
    },

    /// The engine identifier is not in the engine table.
    #[error("Unknown engine '{engine}'")]
    UnknownEngine {
        /// Engine identifier.
        engine: String,
    },

    /// A required configuration key is absent.
    #[error("Missing configuration field '{field}'")]
    MissingField {
        /// Configuration key.
        field: String,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration field '{field}': {reason}")]
    Invalid {
        /// Configuration key.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration source could not be loaded.
    #[error("Cannot load configuration from '{path}': {reason}")]
    Load {
        /// Source path.
        path: String,
        /// Underlying reason.
        reason: String,
    },
}

impl ConfigurationError {
    /// Returns the stable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownProfile { .. } => "CONFIG-001-UNKNOWN_PROFILE",
            Self::UnknownEngine { .. } => "CONFIG-002-UNKNOWN_ENGINE",
            Self::MissingField { .. } => "CONFIG-003-MISSING_FIELD",
            Self::Invalid { .. } => "CONFIG-004-INVALID",
            Self::Load { .. } => "CONFIG-005-LOAD",
        }
    }

    /// Configuration errors never succeed on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

/// Errors raised while wiring the stage graph.
///
/// These indicate a defect in the builder rather than bad user input.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    /// An input refers to a producer slot that is not in the graph.
    #[error("Stage '{consumer}' references missing output '{producer}.{slot}'")]
    DanglingReference {
        /// Consuming stage.
        consumer: String,
        /// Referenced producer stage.
        producer: String,
        /// Referenced output slot.
        slot: String,
    },

    /// A stage name is not usable as a backend step name.
    #[error("Invalid stage name '{name}'")]
    InvalidName {
        /// Stage name.
        name: String,
    },

    /// A stage name was added twice.
    #[error("Stage '{name}' is already part of the graph")]
    DuplicateStage {
        /// Stage name.
        name: String,
    },

    /// A fan-out operation was applied to a stage without a fan-out spec.
    #[error("Stage '{name}' is not a fan-out template")]
    NotFanOut {
        /// Stage name.
        name: String,
    },

    /// The fan-out width could not be read from the producer outputs.
    #[error("Cannot resolve fan-out width of '{stage}': {reason}")]
    FanOutWidth {
        /// Calculate stage name.
        stage: String,
        /// Why resolution failed.
        reason: String,
    },

    /// The graph has no Post stage to collect a result from.
    #[error("Graph '{name}' has no Post stage")]
    MissingPost {
        /// Graph name.
        name: String,
    },
}

impl GraphError {
    /// Returns the stable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DanglingReference { .. } => "GRAPH-001-DANGLING",
            Self::InvalidName { .. } => "GRAPH-006-INVALID_NAME",
            Self::DuplicateStage { .. } => "GRAPH-002-DUPLICATE",
            Self::NotFanOut { .. } => "GRAPH-003-NOT_FAN_OUT",
            Self::FanOutWidth { .. } => "GRAPH-004-FAN_OUT_WIDTH",
            Self::MissingPost { .. } => "GRAPH-005-MISSING_POST",
        }
    }
}

/// Errors reported by the backend runtime collaborator.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The graph could not be submitted.
    #[error("Submission failed: {0}")]
    Submit(String),

    /// A status or output query failed.
    #[error("Query failed for '{handle}': {reason}")]
    Query {
        /// Submission handle.
        handle: String,
        /// Underlying reason.
        reason: String,
    },

    /// The handle is not known to the backend.
    #[error("Unknown submission handle '{0}'")]
    UnknownHandle(String),

    /// A stage output slot was not produced.
    #[error("Stage '{stage}' has no output '{slot}'")]
    MissingOutput {
        /// Stage name.
        stage: String,
        /// Output slot.
        slot: String,
    },

    /// An artifact could not be retrieved.
    #[error("Cannot fetch artifact '{artifact}': {reason}")]
    Fetch {
        /// Artifact reference.
        artifact: String,
        /// Underlying reason.
        reason: String,
    },
}

impl BackendError {
    /// Transport failures may clear up; missing handles or outputs will not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Submit(_) | Self::Query { .. } | Self::Fetch { .. })
    }
}

/// Errors from Make-side task discovery and Post-side aggregation.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// A structure pattern is not a valid glob.
    #[error("Invalid structure pattern '{pattern}': {reason}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying reason.
        reason: String,
    },

    /// The working directory could not be walked.
    #[error("Cannot scan '{root}': {reason}")]
    Scan {
        /// Directory being scanned.
        root: String,
        /// Underlying reason.
        reason: String,
    },

    /// Task paths were not in lexical order.
    #[error("Task list is not in lexical order at '{path}'")]
    Unordered {
        /// First out-of-order path.
        path: String,
    },

    /// A task produced no result.
    #[error("No result for task {index} of {expected}")]
    MissingResult {
        /// Task index.
        index: usize,
        /// Expected number of results.
        expected: usize,
    },
}

impl TaskError {
    /// Returns the stable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pattern { .. } => "TASK-001-PATTERN",
            Self::Scan { .. } => "TASK-002-SCAN",
            Self::Unordered { .. } => "TASK-003-UNORDERED",
            Self::MissingResult { .. } => "TASK-004-MISSING_RESULT",
        }
    }
}

/// A submitted run finished without succeeding.
#[derive(Debug, Clone, Error)]
#[error("Run '{handle}' finished with status {status}")]
pub struct ExecutionFailure {
    /// Submission handle, empty when nothing was submitted.
    pub handle: String,
    /// The terminal status observed by the driver.
    pub status: RunStatus,
}
