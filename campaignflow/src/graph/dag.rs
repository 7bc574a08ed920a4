//! The stage graph data structure.
//!
//! Nodes are appended in submission order. A node may only reference outputs of
//! nodes already in the graph, so the insertion order is always a valid
//! topological order and the graph is acyclic by construction.

use super::node::StageNode;
use crate::core::{slots, ArtifactRef, CampaignKind, StageKind};
use crate::errors::GraphError;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::LazyLock;

static STAGE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").ok());

/// A data dependency between two stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Upstream output slot.
    pub from: ArtifactRef,
    /// Consuming stage.
    pub to_stage: String,
    /// Consuming slot.
    pub to_slot: String,
    /// True if producer and consumer belong to different campaigns.
    pub cross_campaign: bool,
}

/// A directed acyclic graph of stages, immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct StageGraph {
    name: String,
    nodes: Vec<StageNode>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl StageGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Appends a node after checking its name and references.
    pub(crate) fn add_node(&mut self, node: StageNode) -> Result<(), GraphError> {
        let valid_name = STAGE_NAME
            .as_ref()
            .is_some_and(|re| re.is_match(&node.name));
        if !valid_name {
            return Err(GraphError::InvalidName { name: node.name });
        }
        if self.index.contains_key(&node.name) {
            return Err(GraphError::DuplicateStage { name: node.name });
        }

        for (_, reference) in node.references() {
            let resolved = self
                .node(&reference.producer)
                .is_some_and(|producer| producer.produces(&reference.slot));
            if !resolved {
                return Err(GraphError::DanglingReference {
                    consumer: node.name.clone(),
                    producer: reference.producer.clone(),
                    slot: reference.slot.clone(),
                });
            }
        }

        self.index.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Returns the graph name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the nodes in execution order.
    #[must_use]
    pub fn nodes(&self) -> &[StageNode] {
        &self.nodes
    }

    /// Looks up a node by name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&StageNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Returns every data dependency in the graph.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.nodes
            .iter()
            .flat_map(|consumer| {
                consumer.inputs.iter().filter_map(move |(slot, binding)| {
                    let from = binding.as_output()?;
                    let producer = self.node(&from.producer)?;
                    Some(Edge {
                        from: from.clone(),
                        to_stage: consumer.name.clone(),
                        to_slot: slot.clone(),
                        cross_campaign: producer.campaign != consumer.campaign,
                    })
                })
            })
            .collect()
    }

    /// Returns only the edges that link two campaigns.
    #[must_use]
    pub fn cross_campaign_edges(&self) -> Vec<Edge> {
        self.edges().into_iter().filter(|e| e.cross_campaign).collect()
    }

    /// Returns the stable keys a backend will report for this graph.
    ///
    /// Fan-out templates appear as `<name>-{item}`.
    #[must_use]
    pub fn stage_keys(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|n| match &n.fan_out {
                Some(spec) => format!("{}-{{item}}", spec.key_prefix),
                None => n.name.clone(),
            })
            .collect()
    }

    /// Returns the Post stage of a campaign.
    #[must_use]
    pub fn post_stage(&self, campaign: CampaignKind) -> Option<&StageNode> {
        self.nodes
            .iter()
            .find(|n| n.kind == StageKind::Post && n.campaign == campaign)
    }

    /// Returns the last Post stage, whose trimmed output is the run result.
    pub fn final_post_stage(&self) -> Result<&StageNode, GraphError> {
        self.nodes
            .iter()
            .rev()
            .find(|n| n.kind == StageKind::Post && n.produces(slots::OUTPUT_POST))
            .ok_or_else(|| GraphError::MissingPost {
                name: self.name.clone(),
            })
    }

    /// Returns the reference to the run's final artifact.
    pub fn final_artifact(&self) -> Result<ArtifactRef, GraphError> {
        self.final_post_stage()
            .map(|post| ArtifactRef::new(post.name.clone(), slots::OUTPUT_POST))
    }

    /// Returns a content hash of the graph.
    ///
    /// Two builds from the same inputs hash identically.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}
