//! Submission and polling of built stage graphs.
//!
//! [`ExecutionDriver`] hands a [`StageGraph`](crate::graph::StageGraph) to a
//! [`Backend`](crate::backend::Backend), polls until a terminal status and,
//! on success, retrieves the final Post artifact.

mod config;
mod execution;
mod result;

#[cfg(test)]
mod scenario_tests;

pub use config::DriverConfig;
pub use execution::ExecutionDriver;
pub use result::{FinalArtifact, RunResult};
