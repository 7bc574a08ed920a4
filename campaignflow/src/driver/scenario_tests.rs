//! Driver scenarios against scripted, mocked and local backends.

use super::*;
use crate::backend::{LocalBackend, MockBackend, StageInvocation, StageRunner, SubmissionHandle};
use crate::cancellation::CancellationToken;
use crate::core::{
    slots, ArtifactRef, BackendStatus, InputDescriptor, OutputValue, RunStatus, StageKind,
    StageOutputs,
};
use crate::errors::{BackendError, CampaignflowError};
use crate::events::CollectingEventSink;
use crate::graph::{StageGraph, StageGraphBuilder};
use crate::planner::FlowPlan;
use crate::profiles::{EngineDescriptor, ExecutorProfileRegistry, LAMMPS};
use crate::testing::{sample_config, ScriptedBackend, SyntheticRunner};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn graph(plan: &FlowPlan) -> StageGraph {
    let registry =
        ExecutorProfileRegistry::from_config(&sample_config(), EngineDescriptor::builtin());
    StageGraphBuilder::new(LAMMPS, "/work")
        .build(plan, &registry)
        .unwrap()
}

fn relax_graph() -> StageGraph {
    graph(&FlowPlan::relax_only(InputDescriptor::from("relax.json")))
}

fn joint_graph() -> StageGraph {
    graph(&FlowPlan::joint(
        InputDescriptor::from("relax.json"),
        InputDescriptor::from("props.json"),
    ))
}

fn relax_post_ref() -> ArtifactRef {
    ArtifactRef::new("Relaxpost", slots::OUTPUT_POST)
}

fn succeeding_backend(statuses: Vec<BackendStatus>) -> ScriptedBackend {
    ScriptedBackend::new(statuses)
        .with_stage_outputs(
            "Relaxpost",
            StageOutputs::new().with(
                slots::OUTPUT_POST,
                OutputValue::Artifact(PathBuf::from("/remote/Relaxpost/output_post")),
            ),
        )
        .with_artifact(relax_post_ref(), "/tmp/results/output_post")
}

#[tokio::test(start_paused = true)]
async fn test_pending_running_succeeded() {
    let backend = Arc::new(succeeding_backend(vec![
        BackendStatus::Pending,
        BackendStatus::Running,
        BackendStatus::Succeeded,
    ]));
    let sink = Arc::new(CollectingEventSink::new());
    let driver = ExecutionDriver::new(backend.clone(), DriverConfig::default())
        .with_event_sink(sink.clone());
    let graph = relax_graph();

    let start = tokio::time::Instant::now();
    let result = driver.run(&graph).await.unwrap();

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.polls, 3);
    assert_eq!(result.fingerprint, graph.fingerprint());
    assert_eq!(
        result.final_artifact,
        Some(FinalArtifact {
            reference: relax_post_ref(),
            local_path: PathBuf::from("/tmp/results/output_post"),
        })
    );
    assert_eq!(start.elapsed(), Duration::from_secs(8));
    assert_eq!(backend.submissions(), vec![graph.fingerprint()]);
    assert_eq!(
        sink.event_types(),
        vec![
            "run.submitted",
            "run.status_changed",
            "run.status_changed",
            "run.completed"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_running_failed() {
    let backend = Arc::new(succeeding_backend(vec![
        BackendStatus::Running,
        BackendStatus::Failed,
    ]));
    let sink = Arc::new(CollectingEventSink::new());
    let driver =
        ExecutionDriver::new(backend, DriverConfig::default()).with_event_sink(sink.clone());

    let result = driver.run(&relax_graph()).await.unwrap();

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.final_artifact.is_none());
    assert_eq!(result.polls, 2);
    assert_eq!(sink.event_types().last(), Some(&"run.failed"));

    let failure = result.into_result().unwrap_err();
    assert_eq!(failure.status, RunStatus::Failed);
    assert_eq!(failure.handle, "relaxation-scripted-1");
}

#[tokio::test(start_paused = true)]
async fn test_max_wait_times_out() {
    let backend = Arc::new(ScriptedBackend::new([BackendStatus::Running]));
    let sink = Arc::new(CollectingEventSink::new());
    let config = DriverConfig::default()
        .with_poll_interval(Duration::from_secs(4))
        .with_max_wait(Duration::from_secs(10));
    let driver = ExecutionDriver::new(backend.clone(), config).with_event_sink(sink.clone());

    let start = tokio::time::Instant::now();
    let result = driver.run(&relax_graph()).await.unwrap();

    assert_eq!(result.status, RunStatus::TimedOut);
    assert!(result.final_artifact.is_none());
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert!(start.elapsed() < Duration::from_secs(14));
    assert!(backend.polls() >= 3);
    assert_eq!(sink.event_types().last(), Some(&"run.timed_out"));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_wakes_poll_sleep() {
    let backend = Arc::new(ScriptedBackend::new([BackendStatus::Running]));
    let sink = Arc::new(CollectingEventSink::new());
    let driver = ExecutionDriver::new(backend.clone(), DriverConfig::default())
        .with_event_sink(sink.clone());
    let graph = relax_graph();
    let token = CancellationToken::new();

    let start = tokio::time::Instant::now();
    let (result, ()) = tokio::join!(driver.run_with_cancellation(&graph, &token), async {
        tokio::time::sleep(Duration::from_secs(6)).await;
        token.cancel("user abort");
    });
    let result = result.unwrap();

    assert_eq!(result.status, RunStatus::Cancelled);
    assert_eq!(result.polls, 2);
    assert_eq!(start.elapsed(), Duration::from_secs(6));
    assert_eq!(
        sink.events().last(),
        Some(&crate::events::RunEvent::Cancelled {
            handle: "relaxation-scripted-1".to_string(),
            reason: Some("user abort".to_string()),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_first_poll() {
    let backend = Arc::new(ScriptedBackend::new([BackendStatus::Succeeded]));
    let driver = ExecutionDriver::new(backend.clone(), DriverConfig::default());
    let token = CancellationToken::new();
    token.cancel("shutdown");

    let result = driver
        .run_with_cancellation(&relax_graph(), &token)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Cancelled);
    assert_eq!(result.polls, 0);
    assert_eq!(backend.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_final_output_is_an_error() {
    let backend = Arc::new(ScriptedBackend::new([BackendStatus::Succeeded]));
    let driver = ExecutionDriver::new(backend, DriverConfig::default());

    let err = driver.run(&relax_graph()).await.unwrap_err();
    assert!(matches!(
        err,
        CampaignflowError::Backend(BackendError::MissingOutput { .. })
    ));
}

#[tokio::test]
async fn test_status_query_error_propagates() {
    let mut backend = MockBackend::new();
    backend
        .expect_submit()
        .times(1)
        .returning(|_| Ok(SubmissionHandle::new("mock-1")));
    backend.expect_query_status().times(1).returning(|handle| {
        Err(BackendError::Query {
            handle: handle.to_string(),
            reason: "connection refused".to_string(),
        })
    });
    backend.expect_query_stage_outputs().never();
    backend.expect_fetch_artifact().never();

    let driver = ExecutionDriver::new(Arc::new(backend), DriverConfig::default());
    let err = driver.run(&relax_graph()).await.unwrap_err();

    assert!(matches!(
        err,
        CampaignflowError::Backend(BackendError::Query { ref handle, .. }) if handle == "mock-1"
    ));
    assert!(!err.is_pre_submission());
}

#[tokio::test]
async fn test_submit_error_stops_before_polling() {
    let mut backend = MockBackend::new();
    backend.expect_submit().times(1).returning(|_| {
        Err(BackendError::Submit("quota exceeded".to_string()))
    });
    backend.expect_query_status().never();

    let driver = ExecutionDriver::new(Arc::new(backend), DriverConfig::default());
    let err = driver.run(&relax_graph()).await.unwrap_err();

    assert!(matches!(err, CampaignflowError::Backend(BackendError::Submit(_))));
}

#[tokio::test]
async fn test_local_backend_joint_run() {
    let runner = Arc::new(SyntheticRunner::new(2));
    let backend = Arc::new(LocalBackend::new(runner.clone()));
    let config = DriverConfig::default().with_poll_interval(Duration::from_millis(10));
    let driver = ExecutionDriver::new(backend.clone(), config);

    let result = driver
        .run(&joint_graph())
        .await
        .unwrap()
        .into_result()
        .unwrap();

    let artifact = result.final_artifact.unwrap();
    assert_eq!(artifact.reference.to_string(), "Propspost.output_post");
    assert_eq!(artifact.local_path, PathBuf::from("/work/Propspost/output_post"));
    assert_eq!(runner.invocations_of(StageKind::Calculate), 4);
    assert_eq!(backend.run_count(), 0);
}

struct PanicOnPost(SyntheticRunner);

#[async_trait]
impl StageRunner for PanicOnPost {
    async fn run(&self, invocation: StageInvocation) -> anyhow::Result<StageOutputs> {
        assert!(invocation.kind != StageKind::Post, "adapter bug");
        self.0.run(invocation).await
    }
}

#[tokio::test]
async fn test_panicking_adapter_reports_failure() {
    let backend = Arc::new(LocalBackend::new(Arc::new(PanicOnPost(SyntheticRunner::new(2)))));
    let config = DriverConfig::default().with_poll_interval(Duration::from_millis(10));
    let driver = ExecutionDriver::new(backend.clone(), config);

    let result = tokio::time::timeout(Duration::from_secs(5), driver.run(&relax_graph()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.final_artifact.is_none());
    assert_eq!(backend.run_count(), 0);
}
