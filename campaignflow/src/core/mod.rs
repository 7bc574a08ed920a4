//! Core domain model types for campaignflow.
//!
//! This module contains the vocabulary shared by every other module:
//! - Campaign, stage and resource-tier enums
//! - Input descriptors and artifact references
//! - Backend and run status enums

mod artifact;
mod campaign;
mod status;

pub use artifact::{slots, ArtifactRef, OutputValue, StageOutputs};
pub use campaign::{CampaignKind, FanOutMode, InputDescriptor, ResourceTier, StageKind};
pub use status::{BackendStatus, RunStatus};
