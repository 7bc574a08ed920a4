//! Resolution of input descriptors into a flow plan.

use super::FlowPlan;
use crate::classify::TaskClassifier;
use crate::core::{CampaignKind, InputDescriptor};
use crate::errors::ValidationError;
use std::sync::Arc;
use tracing::info;

/// Resolves one or two input descriptors into a [`FlowPlan`].
///
/// Planning consults only the injected classifier; there is no other input.
#[derive(Debug, Clone)]
pub struct CampaignPlanner {
    classifier: Arc<dyn TaskClassifier>,
}

impl CampaignPlanner {
    /// Creates a planner around a classifier.
    #[must_use]
    pub fn new(classifier: Arc<dyn TaskClassifier>) -> Self {
        Self { classifier }
    }

    /// Plans a flow.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgumentCount` unless 1 or 2 descriptors are given,
    /// `DuplicateCampaignKind` if two descriptors classify the same, and a
    /// classification error if a descriptor cannot be classified.
    pub fn plan(&self, descriptors: &[InputDescriptor]) -> Result<FlowPlan, ValidationError> {
        let plan = match descriptors {
            [single] => match self.classifier.classify(single)? {
                CampaignKind::Relax => FlowPlan::relax_only(single.clone()),
                CampaignKind::Properties => FlowPlan::properties_only(single.clone()),
            },
            [first, second] => {
                let first_kind = self.classifier.classify(first)?;
                let second_kind = self.classifier.classify(second)?;

                match (first_kind, second_kind) {
                    (CampaignKind::Relax, CampaignKind::Properties) => {
                        FlowPlan::joint(first.clone(), second.clone())
                    }
                    (CampaignKind::Properties, CampaignKind::Relax) => {
                        FlowPlan::joint(second.clone(), first.clone())
                    }
                    (kind, _) => return Err(ValidationError::DuplicateCampaignKind { kind }),
                }
            }
            _ => {
                return Err(ValidationError::InvalidArgumentCount {
                    count: descriptors.len(),
                })
            }
        };

        info!(kind = %plan.kind(), campaigns = plan.campaigns().len(), "Resolved flow plan");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::FlowKind;
    use crate::testing::MapClassifier;
    use pretty_assertions::assert_eq;

    fn planner() -> CampaignPlanner {
        let classifier = MapClassifier::new()
            .with("relax.json", CampaignKind::Relax)
            .with("relax2.json", CampaignKind::Relax)
            .with("props.json", CampaignKind::Properties);
        CampaignPlanner::new(Arc::new(classifier))
    }

    fn d(path: &str) -> InputDescriptor {
        InputDescriptor::from(path)
    }

    #[test]
    fn test_single_relax() {
        let plan = planner().plan(&[d("relax.json")]).unwrap();
        assert_eq!(plan.kind(), FlowKind::RelaxOnly);
        assert_eq!(plan.relax_descriptor(), Some(&d("relax.json")));
        assert_eq!(plan.properties_descriptor(), None);
    }

    #[test]
    fn test_single_properties() {
        let plan = planner().plan(&[d("props.json")]).unwrap();
        assert_eq!(plan.kind(), FlowKind::PropertiesOnly);
        assert_eq!(plan.properties_descriptor(), Some(&d("props.json")));
        assert_eq!(plan.relax_descriptor(), None);
    }

    #[test]
    fn test_joint_is_order_independent() {
        let forward = planner().plan(&[d("relax.json"), d("props.json")]).unwrap();
        let reverse = planner().plan(&[d("props.json"), d("relax.json")]).unwrap();

        assert_eq!(forward.kind(), FlowKind::Joint);
        assert_eq!(forward, reverse);
        assert_eq!(forward.relax_descriptor(), Some(&d("relax.json")));
    }

    #[test]
    fn test_duplicate_kind() {
        let err = planner().plan(&[d("relax.json"), d("relax2.json")]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::DuplicateCampaignKind {
                kind: CampaignKind::Relax
            }
        ));
    }

    #[test]
    fn test_argument_count() {
        let err = planner().plan(&[]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidArgumentCount { count: 0 }));

        let err = planner()
            .plan(&[d("relax.json"), d("props.json"), d("relax2.json")])
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidArgumentCount { count: 3 }));
    }

    #[test]
    fn test_unclassifiable_descriptor() {
        let err = planner().plan(&[d("unknown.json")]).unwrap_err();
        assert!(matches!(err, ValidationError::Classification(_)));
    }
}
