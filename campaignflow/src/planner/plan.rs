//! Flow plan types.

use crate::core::{CampaignKind, InputDescriptor};
use serde::Serialize;
use std::fmt;

/// Which campaigns a flow runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// A single relax campaign.
    RelaxOnly,
    /// A single properties campaign.
    PropertiesOnly,
    /// Relax chained into properties.
    Joint,
}

impl FlowKind {
    /// Workflow name used when submitting a flow of this kind.
    #[must_use]
    pub fn workflow_name(self) -> &'static str {
        match self {
            Self::RelaxOnly => "relaxation",
            Self::PropertiesOnly => "properties",
            Self::Joint => "relax-props",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelaxOnly => write!(f, "relax_only"),
            Self::PropertiesOnly => write!(f, "properties_only"),
            Self::Joint => write!(f, "joint"),
        }
    }
}

/// The resolved plan for a run.
///
/// Fields are private so the slot invariants hold for every value:
/// `RelaxOnly` has only a relax descriptor, `PropertiesOnly` only a
/// properties descriptor, and `Joint` has both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowPlan {
    kind: FlowKind,
    relax: Option<InputDescriptor>,
    properties: Option<InputDescriptor>,
}

impl FlowPlan {
    /// Creates a relax-only plan.
    #[must_use]
    pub fn relax_only(descriptor: InputDescriptor) -> Self {
        Self {
            kind: FlowKind::RelaxOnly,
            relax: Some(descriptor),
            properties: None,
        }
    }

    /// Creates a properties-only plan.
    #[must_use]
    pub fn properties_only(descriptor: InputDescriptor) -> Self {
        Self {
            kind: FlowKind::PropertiesOnly,
            relax: None,
            properties: Some(descriptor),
        }
    }

    /// Creates a joint plan.
    #[must_use]
    pub fn joint(relax: InputDescriptor, properties: InputDescriptor) -> Self {
        Self {
            kind: FlowKind::Joint,
            relax: Some(relax),
            properties: Some(properties),
        }
    }

    /// Returns the plan kind.
    #[must_use]
    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    /// Returns the relax descriptor, if any.
    #[must_use]
    pub fn relax_descriptor(&self) -> Option<&InputDescriptor> {
        self.relax.as_ref()
    }

    /// Returns the properties descriptor, if any.
    #[must_use]
    pub fn properties_descriptor(&self) -> Option<&InputDescriptor> {
        self.properties.as_ref()
    }

    /// Returns the campaigns to run, relax first.
    #[must_use]
    pub fn campaigns(&self) -> Vec<(CampaignKind, &InputDescriptor)> {
        let mut campaigns = Vec::with_capacity(2);
        if let Some(ref relax) = self.relax {
            campaigns.push((CampaignKind::Relax, relax));
        }
        if let Some(ref properties) = self.properties {
            campaigns.push((CampaignKind::Properties, properties));
        }
        campaigns
    }

    /// Returns the campaign whose Post output is the result of the flow.
    #[must_use]
    pub fn final_campaign(&self) -> CampaignKind {
        match self.kind {
            FlowKind::RelaxOnly => CampaignKind::Relax,
            FlowKind::PropertiesOnly | FlowKind::Joint => CampaignKind::Properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relax_only_slots() {
        let plan = FlowPlan::relax_only(InputDescriptor::from("relax.json"));
        assert_eq!(plan.kind(), FlowKind::RelaxOnly);
        assert!(plan.relax_descriptor().is_some());
        assert!(plan.properties_descriptor().is_none());
        assert_eq!(plan.final_campaign(), CampaignKind::Relax);
    }

    #[test]
    fn test_joint_campaign_order() {
        let plan = FlowPlan::joint(
            InputDescriptor::from("relax.json"),
            InputDescriptor::from("props.json"),
        );
        let kinds: Vec<CampaignKind> = plan.campaigns().into_iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![CampaignKind::Relax, CampaignKind::Properties]);
        assert_eq!(plan.final_campaign(), CampaignKind::Properties);
    }

    #[test]
    fn test_workflow_names() {
        assert_eq!(FlowKind::RelaxOnly.workflow_name(), "relaxation");
        assert_eq!(FlowKind::PropertiesOnly.workflow_name(), "properties");
        assert_eq!(FlowKind::Joint.workflow_name(), "relax-props");
    }
}
