use serde::Serialize;

use super::error::FailureStage;
use crate::models::{HealthAnalysis, Observation};

/// Where the returned diagnosis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosisSource {
    /// New analysis, persisted.
    Fresh,
    /// Last known analysis reused after a failure at `failed_stage`; nothing persisted.
    Fallback { failed_stage: FailureStage },
}

/// Result of a diagnosis update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisOutcome {
    pub health_score: f64,
    pub health_analysis: HealthAnalysis,
    /// The selected observation; carries the new analysis on a fresh result
    /// and is unchanged on fallback.
    pub updated_observation: Observation,
    pub source: DiagnosisSource,
}

impl DiagnosisOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, DiagnosisSource::Fallback { .. })
    }
}
