//! Campaign, stage and tier enums plus the input descriptor reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The kind of campaign an input descriptor asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignKind {
    /// Structure relaxation.
    Relax,
    /// Property calculation.
    Properties,
}

impl CampaignKind {
    /// Prefix used when naming the stages of this campaign.
    #[must_use]
    pub fn stage_prefix(self) -> &'static str {
        match self {
            Self::Relax => "Relax",
            Self::Properties => "Props",
        }
    }
}

impl fmt::Display for CampaignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relax => write!(f, "relax"),
            Self::Properties => write!(f, "properties"),
        }
    }
}

/// The role a stage plays inside a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Expands the configuration into task directories.
    Make,
    /// Runs each task; fanned out.
    Calculate,
    /// Aggregates per-task results.
    Post,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Make => write!(f, "make"),
            Self::Calculate => write!(f, "calculate"),
            Self::Post => write!(f, "post"),
        }
    }
}

/// Compute-resource class used to select an executor profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTier {
    /// CPU machines.
    Cpu,
    /// GPU machines.
    Gpu,
}

impl fmt::Display for ResourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
        }
    }
}

/// How a Make stage reports the width of the following fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOutMode {
    /// An integer task count.
    Count,
    /// An explicit list of task names; the width is its length.
    NameList,
}

/// Opaque reference to a campaign configuration file.
///
/// The core only hands this to a classifier and to the Make/Post stages;
/// it never interprets the content itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputDescriptor(PathBuf);

impl InputDescriptor {
    /// Creates a descriptor from a path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Returns the referenced path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for InputDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for InputDescriptor {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_kind_display() {
        assert_eq!(CampaignKind::Relax.to_string(), "relax");
        assert_eq!(CampaignKind::Properties.to_string(), "properties");
        assert_eq!(CampaignKind::Properties.stage_prefix(), "Props");
    }

    #[test]
    fn test_campaign_order_puts_relax_first() {
        assert!(CampaignKind::Relax < CampaignKind::Properties);
    }

    #[test]
    fn test_tier_serialize() {
        let json = serde_json::to_string(&ResourceTier::Gpu).unwrap();
        assert_eq!(json, r#""gpu""#);
    }

    #[test]
    fn test_descriptor_is_transparent() {
        let descriptor = InputDescriptor::from("relax.json");
        assert_eq!(serde_json::to_string(&descriptor).unwrap(), r#""relax.json""#);
        assert_eq!(descriptor.to_string(), "relax.json");
    }
}
