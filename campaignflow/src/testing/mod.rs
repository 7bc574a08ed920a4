//! Test doubles for campaignflow.
//!
//! This module provides:
//! - A path-keyed classifier and a populated configuration
//! - A scripted backend that replays a fixed status sequence
//! - A synthetic stage runner for the in-process backend

mod fixtures;
mod mocks;

pub use fixtures::{sample_config, MapClassifier};
pub use mocks::{ScriptedBackend, SyntheticRunner};
