//! Marker-key classifier for JSON descriptors.

use super::TaskClassifier;
use crate::core::{CampaignKind, InputDescriptor};
use crate::errors::ClassificationError;
use tracing::debug;

/// Top-level key that marks a relaxation descriptor.
pub const RELAX_MARKER: &str = "relaxation";

/// Top-level key that marks a properties descriptor.
pub const PROPERTIES_MARKER: &str = "properties";

/// Classifies JSON descriptors by the presence of a top-level marker key.
///
/// Exactly one of the two markers must be present.
#[derive(Debug, Clone)]
pub struct JsonMarkerClassifier {
    relax_marker: String,
    properties_marker: String,
}

impl Default for JsonMarkerClassifier {
    fn default() -> Self {
        Self {
            relax_marker: RELAX_MARKER.to_string(),
            properties_marker: PROPERTIES_MARKER.to_string(),
        }
    }
}

impl JsonMarkerClassifier {
    /// Creates a classifier with the standard marker keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the marker keys.
    #[must_use]
    pub fn with_markers(relax: impl Into<String>, properties: impl Into<String>) -> Self {
        Self {
            relax_marker: relax.into(),
            properties_marker: properties.into(),
        }
    }

    /// Classifies already-parsed descriptor content.
    pub fn classify_value(
        &self,
        descriptor: &InputDescriptor,
        content: &serde_json::Value,
    ) -> Result<CampaignKind, ClassificationError> {
        let object = content
            .as_object()
            .ok_or_else(|| ClassificationError::Malformed {
                descriptor: descriptor.to_string(),
                reason: "top level is not an object".to_string(),
            })?;

        let relax = object.contains_key(&self.relax_marker);
        let properties = object.contains_key(&self.properties_marker);

        match (relax, properties) {
            (true, false) => Ok(CampaignKind::Relax),
            (false, true) => Ok(CampaignKind::Properties),
            (true, true) => Err(ClassificationError::Ambiguous {
                descriptor: descriptor.to_string(),
            }),
            (false, false) => Err(ClassificationError::NoMarker {
                descriptor: descriptor.to_string(),
            }),
        }
    }
}

impl TaskClassifier for JsonMarkerClassifier {
    fn classify(&self, descriptor: &InputDescriptor) -> Result<CampaignKind, ClassificationError> {
        let raw = std::fs::read_to_string(descriptor.path()).map_err(|e| {
            ClassificationError::Unreadable {
                descriptor: descriptor.to_string(),
                reason: e.to_string(),
            }
        })?;

        let content: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| ClassificationError::Malformed {
                descriptor: descriptor.to_string(),
                reason: e.to_string(),
            })?;

        let kind = self.classify_value(descriptor, &content)?;
        debug!(descriptor = %descriptor, %kind, "Classified descriptor");
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_descriptor(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_classify_relax() {
        let file = write_descriptor(r#"{"structures": ["confs/*"], "relaxation": {}}"#);
        let descriptor = InputDescriptor::new(file.path());

        let kind = JsonMarkerClassifier::new().classify(&descriptor).unwrap();
        assert_eq!(kind, CampaignKind::Relax);
    }

    #[test]
    fn test_classify_properties() {
        let file = write_descriptor(r#"{"structures": [], "properties": [{"type": "eos"}]}"#);
        let descriptor = InputDescriptor::new(file.path());

        let kind = JsonMarkerClassifier::new().classify(&descriptor).unwrap();
        assert_eq!(kind, CampaignKind::Properties);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let file = write_descriptor(r#"{"relaxation": {"cal_type": "relaxation"}}"#);
        let descriptor = InputDescriptor::new(file.path());
        let classifier = JsonMarkerClassifier::new();

        let first = classifier.classify(&descriptor).unwrap();
        let second = classifier.classify(&descriptor).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_marker() {
        let file = write_descriptor(r#"{"structures": []}"#);
        let descriptor = InputDescriptor::new(file.path());

        let err = JsonMarkerClassifier::new().classify(&descriptor).unwrap_err();
        assert!(matches!(err, ClassificationError::NoMarker { .. }));
    }

    #[test]
    fn test_both_markers_are_ambiguous() {
        let content = serde_json::json!({"relaxation": {}, "properties": []});
        let err = JsonMarkerClassifier::new()
            .classify_value(&InputDescriptor::from("both.json"), &content)
            .unwrap_err();
        assert!(matches!(err, ClassificationError::Ambiguous { .. }));
    }

    #[test]
    fn test_malformed_content() {
        let file = write_descriptor("not json at all");
        let descriptor = InputDescriptor::new(file.path());

        let err = JsonMarkerClassifier::new().classify(&descriptor).unwrap_err();
        assert!(matches!(err, ClassificationError::Malformed { .. }));
    }

    #[test]
    fn test_non_object_top_level() {
        let err = JsonMarkerClassifier::new()
            .classify_value(&InputDescriptor::from("list.json"), &serde_json::json!([1, 2]))
            .unwrap_err();
        assert!(matches!(err, ClassificationError::Malformed { .. }));
    }

    #[test]
    fn test_unreadable_descriptor() {
        let descriptor = InputDescriptor::from("/definitely/not/here.json");
        let err = JsonMarkerClassifier::new().classify(&descriptor).unwrap_err();
        assert!(matches!(err, ClassificationError::Unreadable { .. }));
    }

    #[test]
    fn test_custom_markers() {
        let classifier = JsonMarkerClassifier::with_markers("equi", "props");
        let kind = classifier
            .classify_value(&InputDescriptor::from("x.json"), &serde_json::json!({"props": []}))
            .unwrap();
        assert_eq!(kind, CampaignKind::Properties);
    }
}
