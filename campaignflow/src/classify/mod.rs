//! Classification of input descriptors into campaign kinds.

mod markers;

pub use markers::{JsonMarkerClassifier, PROPERTIES_MARKER, RELAX_MARKER};

use crate::core::{CampaignKind, InputDescriptor};
use crate::errors::ClassificationError;
use std::fmt::Debug;

/// Decides which campaign an input descriptor belongs to.
///
/// Implementations must be pure: the same descriptor content always yields
/// the same answer, and classifying has no side effects.
pub trait TaskClassifier: Send + Sync + Debug {
    /// Classifies a descriptor.
    fn classify(&self, descriptor: &InputDescriptor) -> Result<CampaignKind, ClassificationError>;
}
