//! Classifier and configuration fixtures.

use crate::classify::TaskClassifier;
use crate::core::{CampaignKind, InputDescriptor};
use crate::errors::ClassificationError;
use crate::profiles::GlobalConfig;
use std::collections::HashMap;
use std::path::PathBuf;

/// Classifies descriptors by exact path lookup.
#[derive(Debug, Clone, Default)]
pub struct MapClassifier {
    kinds: HashMap<PathBuf, CampaignKind>,
}

impl MapClassifier {
    /// Creates an empty classifier; every descriptor is unclassifiable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a descriptor path to a campaign kind.
    #[must_use]
    pub fn with(mut self, path: impl Into<PathBuf>, kind: CampaignKind) -> Self {
        self.kinds.insert(path.into(), kind);
        self
    }
}

impl TaskClassifier for MapClassifier {
    fn classify(&self, descriptor: &InputDescriptor) -> Result<CampaignKind, ClassificationError> {
        self.kinds
            .get(descriptor.path())
            .copied()
            .ok_or_else(|| ClassificationError::NoMarker {
                descriptor: descriptor.to_string(),
            })
    }
}

/// Returns a configuration with every engine and both tiers populated.
#[must_use]
pub fn sample_config() -> GlobalConfig {
    GlobalConfig {
        work_dir: Some(PathBuf::from("/work")),
        email: Some("user@example.com".to_string()),
        password: Some("secret".to_string()),
        program_id: Some(serde_json::json!(1234)),
        dpgen_image_name: Some("dpgen:latest".to_string()),
        vasp_image_name: Some("vasp:6.3".to_string()),
        dpmd_image_name: Some("deepmd:2.2".to_string()),
        abacus_image_name: Some("abacus:3.0".to_string()),
        cpu_scass_type: Some("cpu-class".to_string()),
        gpu_scass_type: Some("gpu-class".to_string()),
        lammps_run_command: Some("lmp -i in.lammps".to_string()),
        vasp_run_command: Some("mpirun -n 16 vasp_std".to_string()),
        abacus_run_command: Some("mpirun -n 16 abacus".to_string()),
        ..GlobalConfig::default()
    }
}
