//! Stage graph builder.
//!
//! Turns a flow plan into a graph of Make, Calculate and Post stages per
//! campaign. In joint mode the properties Make stage consumes the relax Post
//! stage's aggregated tree instead of the working directory.

use super::dag::StageGraph;
use super::node::{FanOutSpec, InputBinding, StageNode};
use crate::core::{
    slots, ArtifactRef, CampaignKind, FanOutMode, InputDescriptor, ResourceTier, StageKind,
};
use crate::errors::{ConfigurationError, Result};
use crate::observability::SpanTimer;
use crate::planner::FlowPlan;
use crate::profiles::{EngineDescriptor, ExecutorProfile, ExecutorProfileRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Stage names of one campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageNames {
    /// Make stage, e.g. `Relaxmake`.
    pub make: String,
    /// Calculate template, e.g. `RelaxLAMMPS-Cal`.
    pub calculate: String,
    /// Post stage, e.g. `Relaxpost`.
    pub post: String,
}

impl StageNames {
    /// Derives the stage names for a campaign and engine.
    #[must_use]
    pub fn new(campaign: CampaignKind, engine: &EngineDescriptor) -> Self {
        let prefix = campaign.stage_prefix();
        Self {
            make: format!("{prefix}make"),
            calculate: format!("{prefix}{}-Cal", engine.label),
            post: format!("{prefix}post"),
        }
    }
}

/// Builds stage graphs for one engine.
#[derive(Debug, Clone)]
pub struct StageGraphBuilder {
    engine: EngineDescriptor,
    work_dir: PathBuf,
    tier: Option<ResourceTier>,
}

impl StageGraphBuilder {
    /// Creates a builder for the engine, uploading `work_dir` as the first Make input.
    #[must_use]
    pub fn new(engine: EngineDescriptor, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            work_dir: work_dir.into(),
            tier: None,
        }
    }

    /// Overrides the engine's default resource tier.
    #[must_use]
    pub fn with_tier(mut self, tier: ResourceTier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Returns the engine this builder targets.
    #[must_use]
    pub fn engine(&self) -> &EngineDescriptor {
        &self.engine
    }

    /// Builds the graph for a plan.
    ///
    /// The executor profile is resolved before any node is created, so a
    /// configuration error never yields a partial graph.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no profile or run command is
    /// available, or a graph error if wiring fails.
    pub fn build(&self, plan: &FlowPlan, registry: &ExecutorProfileRegistry) -> Result<StageGraph> {
        let timer = SpanTimer::start("graph.build");
        let tier = self.tier.unwrap_or(self.engine.tier);
        let profile = registry.resolve(self.engine.id, tier)?;
        let run_command = profile.run_command.clone().ok_or_else(|| {
            ConfigurationError::MissingField {
                field: self.engine.run_command_key.to_string(),
            }
        })?;
        let helper_image = registry.helper_image().map(str::to_string);

        let mut graph = StageGraph::new(plan.kind().workflow_name());
        let mut upstream: Option<ArtifactRef> = None;

        for (campaign, descriptor) in plan.campaigns() {
            let names = StageNames::new(campaign, &self.engine);
            let source = upstream
                .take()
                .map_or_else(|| InputBinding::WorkDir(self.work_dir.clone()), InputBinding::Output);

            graph.add_node(self.make_node(campaign, &names, source, descriptor, &helper_image))?;
            graph.add_node(self.calculate_node(campaign, &names, &profile, &run_command))?;
            graph.add_node(self.post_node(campaign, &names, descriptor, &helper_image))?;
            debug!(campaign = %campaign, make = %names.make, post = %names.post, "Wired campaign stages");

            upstream = Some(ArtifactRef::new(names.post, slots::OUTPUT_ALL));
        }

        info!(
            workflow = graph.name(),
            engine = self.engine.id,
            stages = graph.stage_count(),
            duration_ms = timer.finish(),
            "Built stage graph"
        );
        Ok(graph)
    }

    fn make_node(
        &self,
        campaign: CampaignKind,
        names: &StageNames,
        source: InputBinding,
        descriptor: &InputDescriptor,
        image: &Option<String>,
    ) -> StageNode {
        let width_slot = match self.engine.fan_out {
            FanOutMode::Count => slots::NJOBS,
            FanOutMode::NameList => slots::TASK_NAMES,
        };
        StageNode::new(names.make.as_str(), StageKind::Make, campaign)
            .with_input(slots::INPUT, source)
            .with_input(slots::PARAM, InputBinding::Descriptor(descriptor.clone()))
            .with_output(slots::OUTPUT)
            .with_output(slots::TASK_PATHS)
            .with_output(width_slot)
            .with_image(image.clone())
    }

    fn calculate_node(
        &self,
        campaign: CampaignKind,
        names: &StageNames,
        profile: &Arc<ExecutorProfile>,
        run_command: &str,
    ) -> StageNode {
        let (width_slot, name_param) = match self.engine.fan_out {
            FanOutMode::Count => (slots::NJOBS, None),
            FanOutMode::NameList => (slots::TASK_NAMES, Some(slots::TASK_NAME.to_string())),
        };

        let mut node = StageNode::new(names.calculate.as_str(), StageKind::Calculate, campaign)
            .with_input(
                self.engine.task_slot,
                InputBinding::Output(ArtifactRef::new(names.make.as_str(), slots::TASK_PATHS)),
            )
            .with_input(
                slots::RUN_COMMAND,
                InputBinding::Value(serde_json::Value::String(run_command.to_string())),
            )
            .with_output(self.engine.result_slot)
            .with_executor(Arc::clone(profile))
            .with_image(Some(profile.compute_image.clone()));

        if let Some(param) = &name_param {
            node = node.with_input(
                param.as_str(),
                InputBinding::Output(ArtifactRef::new(names.make.as_str(), slots::TASK_NAMES)),
            );
        }

        node.with_fan_out(FanOutSpec {
            width_source: ArtifactRef::new(names.make.as_str(), width_slot),
            mode: self.engine.fan_out,
            sliced_input: self.engine.task_slot.to_string(),
            sliced_output: self.engine.result_slot.to_string(),
            name_param,
            key_prefix: names.calculate.clone(),
        })
    }

    fn post_node(
        &self,
        campaign: CampaignKind,
        names: &StageNames,
        descriptor: &InputDescriptor,
        image: &Option<String>,
    ) -> StageNode {
        let mut node = StageNode::new(names.post.as_str(), StageKind::Post, campaign)
            .with_input(
                slots::INPUT_POST,
                InputBinding::Output(ArtifactRef::new(
                    names.calculate.as_str(),
                    self.engine.result_slot,
                )),
            )
            .with_input(
                slots::INPUT_ALL,
                InputBinding::Output(ArtifactRef::new(names.make.as_str(), slots::OUTPUT)),
            )
            .with_input(slots::PARAM, InputBinding::Descriptor(descriptor.clone()))
            .with_input(
                slots::PATH,
                InputBinding::Value(serde_json::Value::String(
                    self.work_dir.display().to_string(),
                )),
            )
            .with_output(slots::OUTPUT_ALL)
            .with_output(slots::OUTPUT_POST)
            .with_image(image.clone());

        if self.engine.fan_out == FanOutMode::NameList {
            node = node.with_input(
                slots::TASK_NAMES,
                InputBinding::Output(ArtifactRef::new(names.make.as_str(), slots::TASK_NAMES)),
            );
        }
        node
    }
}
