//! In-process backend.
//!
//! Executes a submitted graph on a tokio task, one node at a time in graph
//! order. Calculate templates are expanded once their Make stage has run and
//! all instances execute concurrently. Any failing instance fails the run.

use super::{Backend, SubmissionHandle};
use crate::core::{
    ArtifactRef, BackendStatus, CampaignKind, OutputValue, StageKind, StageOutputs,
};
use crate::errors::BackendError;
use crate::graph::{FanOutExpander, FanOutInstance, FanOutSpec, InputBinding, StageGraph, StageNode};
use crate::tasks::{aggregate_results, TaskList};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Everything a stage adapter needs to execute one stage or instance.
#[derive(Debug, Clone)]
pub struct StageInvocation {
    /// Stage name.
    pub stage: String,
    /// Stage kind.
    pub kind: StageKind,
    /// Owning campaign.
    pub campaign: CampaignKind,
    /// Fan-out instance, for Calculate stages.
    pub instance: Option<FanOutInstance>,
    /// Task directory of the instance.
    pub task: Option<PathBuf>,
    /// Resolved inputs.
    pub inputs: BTreeMap<String, OutputValue>,
    /// Output slots the stage must fill.
    pub outputs: Vec<String>,
    /// Image the stage runs in.
    pub image: Option<String>,
}

impl StageInvocation {
    /// Returns a resolved input.
    #[must_use]
    pub fn input(&self, slot: &str) -> Option<&OutputValue> {
        self.inputs.get(slot)
    }

    /// Returns the instance key, or the stage name for unreplicated stages.
    #[must_use]
    pub fn key(&self) -> &str {
        self.instance.as_ref().map_or(&self.stage, |i| &i.key)
    }
}

/// Executes the body of a stage. Engine adapters implement this.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Runs one stage or fan-out instance.
    async fn run(&self, invocation: StageInvocation) -> anyhow::Result<StageOutputs>;
}

struct RunState {
    status: RwLock<BackendStatus>,
    outputs: DashMap<String, StageOutputs>,
    error: RwLock<Option<String>>,
}

impl RunState {
    fn new() -> Self {
        Self {
            status: RwLock::new(BackendStatus::Pending),
            outputs: DashMap::new(),
            error: RwLock::new(None),
        }
    }
}

/// Runs graphs in the current process.
#[derive(Clone)]
pub struct LocalBackend {
    runner: Arc<dyn StageRunner>,
    runs: Arc<DashMap<SubmissionHandle, Arc<RunState>>>,
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("runs", &self.runs.len())
            .finish_non_exhaustive()
    }
}

impl LocalBackend {
    /// Creates a backend that executes stages through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn StageRunner>) -> Self {
        Self {
            runner,
            runs: Arc::new(DashMap::new()),
        }
    }

    /// Returns the failure description of a failed run.
    #[must_use]
    pub fn failure(&self, handle: &SubmissionHandle) -> Option<String> {
        self.runs.get(handle).and_then(|run| run.error.read().clone())
    }

    /// Returns the number of runs the backend still tracks.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    fn run_state(&self, handle: &SubmissionHandle) -> Result<Arc<RunState>, BackendError> {
        self.runs
            .get(handle)
            .map(|run| Arc::clone(run.value()))
            .ok_or_else(|| BackendError::UnknownHandle(handle.to_string()))
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn submit(&self, graph: &StageGraph) -> Result<SubmissionHandle, BackendError> {
        let handle = SubmissionHandle::new(format!("{}-{}", graph.name(), Uuid::new_v4().simple()));
        let state = Arc::new(RunState::new());
        self.runs.insert(handle.clone(), Arc::clone(&state));

        let graph = graph.clone();
        let runner = Arc::clone(&self.runner);
        let task_handle = handle.clone();
        tokio::spawn(async move {
            *state.status.write() = BackendStatus::Running;
            let outcome = AssertUnwindSafe(execute_graph(&graph, runner.as_ref(), &state))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(anyhow!("stage adapter panicked: {}", panic_message(&*panic)))
                });
            match outcome {
                Ok(()) => {
                    info!(handle = %task_handle, "Run succeeded");
                    *state.status.write() = BackendStatus::Succeeded;
                }
                Err(err) => {
                    error!(handle = %task_handle, error = %format!("{err:#}"), "Run failed");
                    *state.error.write() = Some(format!("{err:#}"));
                    *state.status.write() = BackendStatus::Failed;
                }
            }
        });

        debug!(handle = %handle, "Graph submitted");
        Ok(handle)
    }

    async fn query_status(&self, handle: &SubmissionHandle) -> Result<BackendStatus, BackendError> {
        let state = self.run_state(handle)?;
        let status = *state.status.read();
        Ok(status)
    }

    async fn query_stage_outputs(
        &self,
        handle: &SubmissionHandle,
        stage: &str,
    ) -> Result<StageOutputs, BackendError> {
        let state = self.run_state(handle)?;
        let outputs = state.outputs.get(stage).map(|o| o.value().clone());
        outputs.ok_or_else(|| BackendError::Query {
            handle: handle.to_string(),
            reason: format!("stage '{stage}' has no recorded outputs"),
        })
    }

    async fn fetch_artifact(
        &self,
        handle: &SubmissionHandle,
        artifact: &ArtifactRef,
    ) -> Result<PathBuf, BackendError> {
        let state = self.run_state(handle)?;
        let value = lookup(&state, artifact)?;
        value
            .as_artifact()
            .map(Path::to_path_buf)
            .ok_or_else(|| BackendError::Fetch {
                artifact: artifact.to_string(),
                reason: "not a single artifact".to_string(),
            })
    }

    async fn release(&self, handle: &SubmissionHandle) -> Result<(), BackendError> {
        self.runs
            .remove(handle)
            .map(|_| debug!(handle = %handle, "Run released"))
            .ok_or_else(|| BackendError::UnknownHandle(handle.to_string()))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn lookup(state: &RunState, reference: &ArtifactRef) -> Result<OutputValue, BackendError> {
    state
        .outputs
        .get(&reference.producer)
        .and_then(|outputs| outputs.get(&reference.slot).cloned())
        .ok_or_else(|| BackendError::MissingOutput {
            stage: reference.producer.clone(),
            slot: reference.slot.clone(),
        })
}

fn resolve_inputs(
    node: &StageNode,
    state: &RunState,
) -> Result<BTreeMap<String, OutputValue>, BackendError> {
    node.inputs
        .iter()
        .map(|(slot, binding)| {
            let value = match binding {
                InputBinding::WorkDir(path) => OutputValue::Artifact(path.clone()),
                InputBinding::Descriptor(descriptor) => {
                    OutputValue::Artifact(descriptor.path().to_path_buf())
                }
                InputBinding::Value(value) => OutputValue::Value(value.clone()),
                InputBinding::Output(reference) => lookup(state, reference)?,
            };
            Ok((slot.clone(), value))
        })
        .collect()
}

fn invocation(node: &StageNode, inputs: BTreeMap<String, OutputValue>) -> StageInvocation {
    StageInvocation {
        stage: node.name.clone(),
        kind: node.kind,
        campaign: node.campaign,
        instance: None,
        task: None,
        inputs,
        outputs: node.outputs.iter().cloned().collect(),
        image: node.image.clone(),
    }
}

async fn execute_graph(
    graph: &StageGraph,
    runner: &dyn StageRunner,
    state: &RunState,
) -> anyhow::Result<()> {
    for node in graph.nodes() {
        let inputs = resolve_inputs(node, state)?;
        let outputs = match &node.fan_out {
            Some(spec) => run_fan_out(node, spec, inputs, runner, state).await?,
            None => runner
                .run(invocation(node, inputs))
                .await
                .with_context(|| format!("stage '{}' failed", node.name))?,
        };

        if let Some(missing) = node.outputs.iter().find(|slot| !outputs.contains(slot)) {
            return Err(BackendError::MissingOutput {
                stage: node.name.clone(),
                slot: missing.clone(),
            }
            .into());
        }
        debug!(stage = %node.name, outputs = outputs.len(), "Stage finished");
        state.outputs.insert(node.name.clone(), outputs);
    }
    Ok(())
}

async fn run_fan_out(
    node: &StageNode,
    spec: &FanOutSpec,
    inputs: BTreeMap<String, OutputValue>,
    runner: &dyn StageRunner,
    state: &RunState,
) -> anyhow::Result<StageOutputs> {
    let producer = state
        .outputs
        .get(&spec.width_source.producer)
        .map(|o| o.value().clone())
        .ok_or_else(|| BackendError::MissingOutput {
            stage: spec.width_source.producer.clone(),
            slot: spec.width_source.slot.clone(),
        })?;
    let width = FanOutExpander::resolve_width(node, &producer)?;
    let instances = FanOutExpander::expand_width(node, &width)?;

    let tasks = match inputs.get(&spec.sliced_input) {
        Some(OutputValue::ArtifactList(paths)) => TaskList::from_sorted(paths.clone())?,
        _ => bail!(
            "input '{}' of '{}' is not a task list",
            spec.sliced_input,
            node.name
        ),
    };
    if tasks.len() != instances.len() {
        bail!(
            "'{}' expands to {} instances but {} tasks were listed",
            node.name,
            instances.len(),
            tasks.len()
        );
    }
    let expected = instances.len();
    info!(stage = %node.name, instances = expected, "Expanding fan-out");

    let mut pending: FuturesUnordered<_> = instances
        .into_iter()
        .map(|instance| {
            let mut invocation = invocation(node, inputs.clone());
            if let Some(task) = instance.select(tasks.paths()) {
                invocation
                    .inputs
                    .insert(spec.sliced_input.clone(), OutputValue::Artifact(task.clone()));
                invocation.task = Some(task.clone());
            }
            if let (Some(param), Some(name)) = (&spec.name_param, &instance.task_name) {
                invocation
                    .inputs
                    .insert(param.clone(), OutputValue::Value(serde_json::json!(name)));
            }
            invocation.instance = Some(instance);
            async move {
                let index = invocation.instance.as_ref().map_or(0, |i| i.index);
                let key = invocation.key().to_string();
                (index, key, runner.run(invocation).await)
            }
        })
        .collect();

    let mut results = Vec::with_capacity(expected);
    let mut failed = Vec::new();
    while let Some((index, key, outcome)) = pending.next().await {
        let result = outcome.and_then(|outputs| {
            outputs
                .get(&spec.sliced_output)
                .and_then(OutputValue::as_artifact)
                .map(Path::to_path_buf)
                .ok_or_else(|| anyhow!("no '{}' output", spec.sliced_output))
        });
        match result {
            Ok(path) => results.push((index, path)),
            Err(err) => {
                warn!(instance = %key, error = %format!("{err:#}"), "Fan-out instance failed");
                failed.push(key);
            }
        }
    }

    if !failed.is_empty() {
        failed.sort();
        bail!(
            "{} of {expected} instances of '{}' failed: {}",
            failed.len(),
            node.name,
            failed.join(", ")
        );
    }

    let collected = aggregate_results(expected, results)?;
    Ok(StageOutputs::new().with(spec.sliced_output.clone(), OutputValue::ArtifactList(collected)))
}
