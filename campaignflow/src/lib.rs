//! # Campaignflow
//!
//! Stage-graph assembly and execution for relaxation and property batch
//! campaigns.
//!
//! Campaignflow turns one or two campaign descriptors into a single
//! executable stage graph and drives it on a backend runtime:
//!
//! - **Classification**: decide whether a descriptor is a relaxation or a
//!   properties campaign
//! - **Planning**: reduce the descriptors to a relax-only, properties-only or
//!   joint plan
//! - **Graph building**: emit Make, Calculate and Post stages per campaign,
//!   chaining a joint plan through the relaxation results
//! - **Fan-out**: expand each Calculate template into one instance per task
//! - **Execution**: submit, poll and retrieve the final aggregated artifact
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use campaignflow::prelude::*;
//!
//! let planner = CampaignPlanner::new(Arc::new(JsonMarkerClassifier::new()));
//! let plan = planner.plan(&[InputDescriptor::from("relax.json")])?;
//! let registry = ExecutorProfileRegistry::from_config(&config, EngineDescriptor::builtin());
//! let graph = StageGraphBuilder::new(LAMMPS, "/work").build(&plan, &registry)?;
//!
//! let result = ExecutionDriver::new(backend, DriverConfig::default())
//!     .run(&graph)
//!     .await?
//!     .into_result()?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backend;
pub mod cancellation;
pub mod classify;
pub mod core;
pub mod driver;
pub mod errors;
pub mod events;
pub mod graph;
pub mod observability;
pub mod planner;
pub mod profiles;
pub mod tasks;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{Backend, LocalBackend, StageInvocation, StageRunner, SubmissionHandle};
    pub use crate::cancellation::CancellationToken;
    pub use crate::classify::{JsonMarkerClassifier, TaskClassifier};
    pub use crate::core::{
        ArtifactRef, BackendStatus, CampaignKind, InputDescriptor, OutputValue, ResourceTier,
        RunStatus, StageKind, StageOutputs,
    };
    pub use crate::driver::{DriverConfig, ExecutionDriver, FinalArtifact, RunResult};
    pub use crate::errors::{
        BackendError, CampaignflowError, ConfigurationError, ExecutionFailure, GraphError,
        TaskError, ValidationError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink, RunEvent};
    pub use crate::graph::{FanOutExpander, FanOutInstance, StageGraph, StageGraphBuilder};
    pub use crate::planner::{CampaignPlanner, FlowKind, FlowPlan};
    pub use crate::profiles::{
        EngineDescriptor, ExecutorProfile, ExecutorProfileRegistry, GlobalConfig, ABACUS, LAMMPS,
        VASP,
    };
}

pub use errors::{CampaignflowError, Result};
