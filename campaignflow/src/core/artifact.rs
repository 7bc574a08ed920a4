//! Artifact references and stage output values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Well-known input and output slot names.
pub mod slots {
    /// Make input: the directory tree to expand.
    pub const INPUT: &str = "input";
    /// Make/Post input: the campaign descriptor.
    pub const PARAM: &str = "param";
    /// Make output: the full expanded working tree.
    pub const OUTPUT: &str = "output";
    /// Make output: ordered per-task directories.
    pub const TASK_PATHS: &str = "task_paths";
    /// Make output: number of tasks.
    pub const NJOBS: &str = "njobs";
    /// Make output: ordered task names.
    pub const TASK_NAMES: &str = "task_names";
    /// Calculate input: the name of the task an instance runs.
    pub const TASK_NAME: &str = "task_name";
    /// Calculate input: engine command line.
    pub const RUN_COMMAND: &str = "run_command";
    /// Post input: aggregated Calculate results.
    pub const INPUT_POST: &str = "input_post";
    /// Post input: Make's full output tree.
    pub const INPUT_ALL: &str = "input_all";
    /// Post input: working-directory path.
    pub const PATH: &str = "path";
    /// Post output: the aggregated tree.
    pub const OUTPUT_ALL: &str = "output_all";
    /// Post output: the trimmed artifact for external consumption.
    pub const OUTPUT_POST: &str = "output_post";
}

/// A back-reference to a named output slot of a producer stage.
///
/// Resolved into a concrete artifact only when the graph executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Producing stage name.
    pub producer: String,
    /// Output slot on the producer.
    pub slot: String,
}

impl ArtifactRef {
    /// Creates a new artifact reference.
    #[must_use]
    pub fn new(producer: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            slot: slot.into(),
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.producer, self.slot)
    }
}

/// A concrete value bound to a stage slot at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OutputValue {
    /// A single directory or file.
    Artifact(PathBuf),
    /// An ordered list of directories or files.
    ArtifactList(Vec<PathBuf>),
    /// A plain parameter.
    Value(serde_json::Value),
}

impl OutputValue {
    /// Returns the path if this is a single artifact.
    #[must_use]
    pub fn as_artifact(&self) -> Option<&Path> {
        match self {
            Self::Artifact(path) => Some(path),
            _ => None,
        }
    }

    /// Returns the paths if this is an artifact list.
    #[must_use]
    pub fn as_artifact_list(&self) -> Option<&[PathBuf]> {
        match self {
            Self::ArtifactList(paths) => Some(paths),
            _ => None,
        }
    }

    /// Returns the parameter if this is a plain value.
    #[must_use]
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Named outputs produced by one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageOutputs(BTreeMap<String, OutputValue>);

impl StageOutputs {
    /// Creates an empty output set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an output.
    #[must_use]
    pub fn with(mut self, slot: impl Into<String>, value: OutputValue) -> Self {
        self.0.insert(slot.into(), value);
        self
    }

    /// Inserts or replaces an output.
    pub fn insert(&mut self, slot: impl Into<String>, value: OutputValue) {
        self.0.insert(slot.into(), value);
    }

    /// Returns an output by slot name.
    #[must_use]
    pub fn get(&self, slot: &str) -> Option<&OutputValue> {
        self.0.get(slot)
    }

    /// Returns true if the slot was produced.
    #[must_use]
    pub fn contains(&self, slot: &str) -> bool {
        self.0.contains_key(slot)
    }

    /// Returns the produced slot names in sorted order.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the number of produced slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
