use serde::{Deserialize, Serialize};

/// Garden-wide summary for one owner. Cached, derived from plant state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GardenSummary {
    pub total_plants: u32,
    /// Mean of the plants' clamped effective scores; 0 with no plants.
    pub average_health: f64,
    /// Plants whose latest assessment is poor/critical or flags a high-severity issue.
    pub urgent_actions: u32,
    pub healthy_plants: u32,
}
