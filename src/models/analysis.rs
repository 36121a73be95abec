use serde::{Deserialize, Serialize};

use super::enums::{IssueSeverity, OverallHealth};

/// One problem spotted in a plant photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub name: String,
    pub severity: IssueSeverity,
    #[serde(default)]
    pub description: Option<String>,
}

/// Qualitative health assessment attached to an observation.
///
/// `confidence` arrives either as a fraction (0–1) or a percentage (0–100);
/// see [`crate::scoring::normalize`] for how it is interpreted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthAnalysis {
    #[serde(default, alias = "overallHealth")]
    pub overall_health: Option<OverallHealth>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl HealthAnalysis {
    /// The category, if it is one of the scored ones.
    pub fn recognized_health(&self) -> Option<OverallHealth> {
        self.overall_health.filter(OverallHealth::is_recognized)
    }

    pub fn has_high_severity_issue(&self) -> bool {
        self.issues.iter().any(|i| i.severity == IssueSeverity::High)
    }
}
