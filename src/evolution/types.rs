use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Observation, Trend};

/// A time bucket of observations spanning at most the evolution window.
/// Derived on every request; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionPeriod {
    /// Timestamp of the first observation in the bucket.
    pub start_date: DateTime<Utc>,
    /// Timestamp of the last observation in the bucket.
    pub end_date: DateTime<Utc>,
    pub observations: Vec<Observation>,
    /// Mean of the scored observations; 0 when none has a score.
    pub average_score: f64,
    pub trend: Trend,
    /// Every observation in the bucket, scored or not.
    pub photo_count: usize,
    /// Observations that contributed to `average_score`.
    pub scored_count: usize,
}

/// Everything the plant evolution screen needs, in one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionView {
    pub plant_id: Uuid,
    pub periods: Vec<EvolutionPeriod>,
    /// First-vs-last period comparison with a dead-band.
    pub overall_trend: Trend,
    pub total_observations: usize,
    pub first_score: Option<f64>,
    pub latest_score: Option<f64>,
}
