//! Executor profiles and their configuration source.
//!
//! This module provides:
//! - `GlobalConfig`, the key-value configuration loaded once at start-up
//! - The data-driven engine table
//! - The read-only `ExecutorProfileRegistry`

mod config;
mod engine;
mod registry;

pub use config::GlobalConfig;
pub use engine::{EngineDescriptor, ABACUS, LAMMPS, VASP};
pub use registry::{DispatchConnection, ExecutorProfile, ExecutorProfileRegistry};
