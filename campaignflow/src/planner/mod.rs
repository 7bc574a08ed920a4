//! Campaign planning.
//!
//! This module provides:
//! - The immutable `FlowPlan` describing which campaigns run and in what order
//! - The `CampaignPlanner` that resolves 1-2 descriptors into a plan

mod plan;
mod resolve;

pub use plan::{FlowKind, FlowPlan};
pub use resolve::CampaignPlanner;
