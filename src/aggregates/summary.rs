use crate::config::HEALTHY_SCORE_THRESHOLD;
use crate::models::{GardenSummary, Plant};
use crate::scoring::effective_health_score;

/// Computes the garden summary for one owner's plants.
///
/// Scores come from [`effective_health_score`], so a plant whose cached
/// scalar lags behind its latest analysis is summarized by the analysis.
pub fn compute_garden_summary(plants: &[Plant]) -> GardenSummary {
    if plants.is_empty() {
        return GardenSummary::default();
    }

    let scores: Vec<f64> = plants.iter().map(effective_health_score).collect();
    let average_health = scores.iter().sum::<f64>() / scores.len() as f64;
    let healthy_plants = scores
        .iter()
        .filter(|&&s| s >= HEALTHY_SCORE_THRESHOLD)
        .count() as u32;
    let urgent_actions = plants.iter().filter(|p| needs_urgent_action(p)).count() as u32;

    GardenSummary {
        total_plants: plants.len() as u32,
        average_health,
        urgent_actions,
        healthy_plants,
    }
}

fn needs_urgent_action(plant: &Plant) -> bool {
    plant
        .latest_observation()
        .and_then(|o| o.health_analysis.as_ref())
        .is_some_and(|a| {
            a.recognized_health().is_some_and(|h| h.needs_attention())
                || a.has_high_severity_issue()
        })
}
