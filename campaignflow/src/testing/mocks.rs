//! Fake backends and stage runners.

use crate::backend::{Backend, StageInvocation, StageRunner, SubmissionHandle};
use crate::core::{
    slots, ArtifactRef, BackendStatus, CampaignKind, OutputValue, StageKind, StageOutputs,
};
use crate::errors::BackendError;
use crate::graph::StageGraph;
use crate::tasks::{property_suffixes, property_task_paths, relax_task_paths, TaskList};
use anyhow::bail;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

/// A backend that replays a fixed status sequence.
///
/// Each status query consumes one entry; the last entry repeats once the
/// script runs out. An empty script reports `Pending` forever.
#[derive(Debug)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<BackendStatus>>,
    last: Mutex<BackendStatus>,
    outputs: RwLock<HashMap<String, StageOutputs>>,
    artifacts: RwLock<HashMap<ArtifactRef, PathBuf>>,
    submissions: Mutex<Vec<String>>,
    polls: AtomicU32,
}

impl ScriptedBackend {
    /// Creates a backend that reports `statuses` in order.
    #[must_use]
    pub fn new(statuses: impl IntoIterator<Item = BackendStatus>) -> Self {
        Self {
            script: Mutex::new(statuses.into_iter().collect()),
            last: Mutex::new(BackendStatus::Pending),
            outputs: RwLock::new(HashMap::new()),
            artifacts: RwLock::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            polls: AtomicU32::new(0),
        }
    }

    /// Registers the outputs a stage reports.
    #[must_use]
    pub fn with_stage_outputs(self, stage: impl Into<String>, outputs: StageOutputs) -> Self {
        self.outputs.write().insert(stage.into(), outputs);
        self
    }

    /// Registers where an artifact is fetched to.
    #[must_use]
    pub fn with_artifact(self, artifact: ArtifactRef, local_path: impl Into<PathBuf>) -> Self {
        self.artifacts.write().insert(artifact, local_path.into());
        self
    }

    /// Returns the fingerprints of every submitted graph.
    #[must_use]
    pub fn submissions(&self) -> Vec<String> {
        self.submissions.lock().clone()
    }

    /// Returns the number of status queries served.
    #[must_use]
    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn submit(&self, graph: &StageGraph) -> Result<SubmissionHandle, BackendError> {
        let mut submissions = self.submissions.lock();
        submissions.push(graph.fingerprint());
        Ok(SubmissionHandle::new(format!(
            "{}-scripted-{}",
            graph.name(),
            submissions.len()
        )))
    }

    async fn query_status(&self, _handle: &SubmissionHandle) -> Result<BackendStatus, BackendError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock();
        if let Some(next) = self.script.lock().pop_front() {
            *last = next;
        }
        Ok(*last)
    }

    async fn query_stage_outputs(
        &self,
        _handle: &SubmissionHandle,
        stage: &str,
    ) -> Result<StageOutputs, BackendError> {
        self.outputs
            .read()
            .get(stage)
            .cloned()
            .ok_or_else(|| BackendError::MissingOutput {
                stage: stage.to_string(),
                slot: "*".to_string(),
            })
    }

    async fn fetch_artifact(
        &self,
        _handle: &SubmissionHandle,
        artifact: &ArtifactRef,
    ) -> Result<PathBuf, BackendError> {
        self.artifacts
            .read()
            .get(artifact)
            .cloned()
            .ok_or_else(|| BackendError::Fetch {
                artifact: artifact.to_string(),
                reason: "not registered".to_string(),
            })
    }
}

/// A stage runner that fabricates plausible outputs without doing work.
///
/// Make pretends to find `confs` configurations `conf.<i>` under its input
/// and lays out their tasks the way real Make stages do: one relaxation task
/// per configuration, or one task per configuration and property. Task names
/// are the task paths relative to the input. Calculate instances return a
/// result path inside their task directory, and Post returns paths under
/// `<path>/<stage>/`.
#[derive(Debug)]
pub struct SyntheticRunner {
    confs: usize,
    properties: Vec<String>,
    fail_index: Option<usize>,
    invocations: Mutex<Vec<StageInvocation>>,
}

impl SyntheticRunner {
    /// Creates a runner whose Make stages see `confs` configurations and a
    /// single `eos` property.
    #[must_use]
    pub fn new(confs: usize) -> Self {
        Self {
            confs,
            properties: property_suffixes(&[serde_json::json!({"type": "eos"})]),
            fail_index: None,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the `properties` entries a properties Make expands.
    #[must_use]
    pub fn with_properties(mut self, properties: &[serde_json::Value]) -> Self {
        self.properties = property_suffixes(properties);
        self
    }

    /// Makes the Calculate instance at `index` fail.
    #[must_use]
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_index = Some(index);
        self
    }

    /// Returns every invocation seen so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<StageInvocation> {
        self.invocations.lock().clone()
    }

    /// Returns how many invocations of a stage kind were seen.
    #[must_use]
    pub fn invocations_of(&self, kind: StageKind) -> usize {
        self.invocations.lock().iter().filter(|i| i.kind == kind).count()
    }

    fn make(&self, invocation: &StageInvocation) -> StageOutputs {
        let root = invocation
            .input(slots::INPUT)
            .and_then(OutputValue::as_artifact)
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let confs = TaskList::new((0..self.confs).map(|i| root.join(format!("conf.{i:06}"))));
        let tasks = match invocation.campaign {
            CampaignKind::Relax => relax_task_paths(&confs),
            CampaignKind::Properties => property_task_paths(&confs, &self.properties),
        };
        let names: Vec<String> = tasks
            .paths()
            .iter()
            .map(|task| task.strip_prefix(&root).unwrap_or(task).display().to_string())
            .collect();

        StageOutputs::new()
            .with(slots::OUTPUT, OutputValue::Artifact(root))
            .with(slots::NJOBS, OutputValue::Value(serde_json::json!(tasks.len())))
            .with(slots::TASK_NAMES, OutputValue::Value(serde_json::json!(names)))
            .with(slots::TASK_PATHS, OutputValue::ArtifactList(tasks.into_paths()))
    }

    fn post(invocation: &StageInvocation) -> StageOutputs {
        let root = invocation
            .input(slots::PATH)
            .and_then(OutputValue::as_value)
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
            .join(&invocation.stage);

        invocation
            .outputs
            .iter()
            .fold(StageOutputs::new(), |outputs, slot| {
                outputs.with(slot.as_str(), OutputValue::Artifact(root.join(slot)))
            })
    }
}

#[async_trait]
impl StageRunner for SyntheticRunner {
    async fn run(&self, invocation: StageInvocation) -> anyhow::Result<StageOutputs> {
        self.invocations.lock().push(invocation.clone());

        match invocation.kind {
            StageKind::Make => Ok(self.make(&invocation)),
            StageKind::Calculate => {
                let index = invocation.instance.as_ref().map(|i| i.index);
                if index.is_some() && index == self.fail_index {
                    bail!("{} exited with status 1", invocation.key());
                }
                let task = invocation.task.clone().unwrap_or_default();
                Ok(invocation
                    .outputs
                    .iter()
                    .fold(StageOutputs::new(), |outputs, slot| {
                        outputs.with(slot.as_str(), OutputValue::Artifact(task.join(slot)))
                    }))
            }
            StageKind::Post => Ok(Self::post(&invocation)),
        }
    }
}
