//! Stage nodes and their input bindings.

use crate::core::{ArtifactRef, CampaignKind, FanOutMode, InputDescriptor, StageKind};
use crate::profiles::ExecutorProfile;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Where a stage input comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum InputBinding {
    /// The raw working directory, uploaded as-is.
    WorkDir(PathBuf),
    /// A campaign descriptor, uploaded as-is.
    Descriptor(InputDescriptor),
    /// A literal parameter.
    Value(serde_json::Value),
    /// An output slot of an upstream stage.
    Output(ArtifactRef),
}

impl InputBinding {
    /// Returns the referenced upstream slot, if this binding is an edge.
    #[must_use]
    pub fn as_output(&self) -> Option<&ArtifactRef> {
        match self {
            Self::Output(r) => Some(r),
            _ => None,
        }
    }
}

/// How a Calculate stage is replicated at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanOutSpec {
    /// Make output that carries the fan-out width.
    pub width_source: ArtifactRef,
    /// Whether the width is a count or a name list.
    pub mode: FanOutMode,
    /// Input slot that receives one element of the per-task list.
    pub sliced_input: String,
    /// Output slot each instance fills; collected in index order.
    pub sliced_output: String,
    /// Input slot that receives the instance's task name.
    pub name_param: Option<String>,
    /// Prefix of the per-instance keys.
    pub key_prefix: String,
}

impl FanOutSpec {
    /// Returns the stable key of the instance at `index`.
    #[must_use]
    pub fn instance_key(&self, index: usize) -> String {
        format!("{}-{index}", self.key_prefix)
    }
}

/// One node of a stage graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageNode {
    /// Unique stage name.
    pub name: String,
    /// Make, Calculate or Post.
    pub kind: StageKind,
    /// Campaign the stage belongs to.
    pub campaign: CampaignKind,
    /// Named inputs.
    pub inputs: BTreeMap<String, InputBinding>,
    /// Named output slots.
    pub outputs: BTreeSet<String>,
    /// Image for helper stages.
    pub image: Option<String>,
    /// Executor profile; Calculate stages only.
    pub executor: Option<Arc<ExecutorProfile>>,
    /// Fan-out template; Calculate stages only.
    pub fan_out: Option<FanOutSpec>,
}

impl StageNode {
    /// Creates a node with no inputs or outputs.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StageKind, campaign: CampaignKind) -> Self {
        Self {
            name: name.into(),
            kind,
            campaign,
            inputs: BTreeMap::new(),
            outputs: BTreeSet::new(),
            image: None,
            executor: None,
            fan_out: None,
        }
    }

    /// Binds an input slot.
    #[must_use]
    pub fn with_input(mut self, slot: impl Into<String>, binding: InputBinding) -> Self {
        self.inputs.insert(slot.into(), binding);
        self
    }

    /// Declares an output slot.
    #[must_use]
    pub fn with_output(mut self, slot: impl Into<String>) -> Self {
        self.outputs.insert(slot.into());
        self
    }

    /// Sets the helper image.
    #[must_use]
    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    /// Binds an executor profile.
    #[must_use]
    pub fn with_executor(mut self, profile: Arc<ExecutorProfile>) -> Self {
        self.executor = Some(profile);
        self
    }

    /// Makes the node a fan-out template.
    #[must_use]
    pub fn with_fan_out(mut self, spec: FanOutSpec) -> Self {
        self.fan_out = Some(spec);
        self
    }

    /// Returns every upstream slot this node depends on, with the consuming slot.
    pub fn references(&self) -> impl Iterator<Item = (&str, &ArtifactRef)> {
        let inputs = self
            .inputs
            .iter()
            .filter_map(|(slot, binding)| binding.as_output().map(|r| (slot.as_str(), r)));
        let width = self
            .fan_out
            .iter()
            .map(|spec| ("<fan-out width>", &spec.width_source));
        inputs.chain(width)
    }

    /// Returns true if the node declares the output slot.
    #[must_use]
    pub fn produces(&self, slot: &str) -> bool {
        self.outputs.contains(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::slots;

    #[test]
    fn test_instance_key() {
        let spec = FanOutSpec {
            width_source: ArtifactRef::new("Relaxmake", slots::NJOBS),
            mode: FanOutMode::Count,
            sliced_input: "input_lammps".to_string(),
            sliced_output: "output_lammps".to_string(),
            name_param: None,
            key_prefix: "RelaxLAMMPS-Cal".to_string(),
        };
        assert_eq!(spec.instance_key(7), "RelaxLAMMPS-Cal-7");
    }

    #[test]
    fn test_references_include_fan_out_width() {
        let node = StageNode::new("RelaxLAMMPS-Cal", StageKind::Calculate, CampaignKind::Relax)
            .with_input(
                "input_lammps",
                InputBinding::Output(ArtifactRef::new("Relaxmake", slots::TASK_PATHS)),
            )
            .with_input(slots::RUN_COMMAND, InputBinding::Value(serde_json::json!("lmp")))
            .with_fan_out(FanOutSpec {
                width_source: ArtifactRef::new("Relaxmake", slots::NJOBS),
                mode: FanOutMode::Count,
                sliced_input: "input_lammps".to_string(),
                sliced_output: "output_lammps".to_string(),
                name_param: None,
                key_prefix: "RelaxLAMMPS-Cal".to_string(),
            });

        let refs: Vec<String> = node.references().map(|(_, r)| r.to_string()).collect();
        assert_eq!(refs, vec!["Relaxmake.task_paths", "Relaxmake.njobs"]);
    }

    #[test]
    fn test_binding_serialization() {
        let binding = InputBinding::Output(ArtifactRef::new("Relaxpost", slots::OUTPUT_ALL));
        let json = serde_json::to_value(&binding).unwrap();
        assert_eq!(json["source"], "output");
        assert_eq!(json["value"]["producer"], "Relaxpost");
    }
}
