use crate::config::OVERALL_TREND_DEAD_BAND;
use crate::models::{Plant, Trend};
use crate::scoring::observation_score;
use super::bucket::bucket;
use super::types::{EvolutionPeriod, EvolutionView};

/// Compares the first and last period averages. Differences within
/// ±`OVERALL_TREND_DEAD_BAND` are stable.
pub fn overall_trend(periods: &[EvolutionPeriod]) -> Trend {
    let (Some(first), Some(last)) = (periods.first(), periods.last()) else {
        return Trend::Stable;
    };

    let delta = last.average_score - first.average_score;
    if delta > OVERALL_TREND_DEAD_BAND {
        Trend::Improving
    } else if delta < -OVERALL_TREND_DEAD_BAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Recomputes the evolution view from the plant's current observations.
pub fn evolution_view(plant: &Plant) -> EvolutionView {
    let periods = bucket(&plant.observations);
    let overall = overall_trend(&periods);

    let scored_in_order = periods
        .iter()
        .flat_map(|p| p.observations.iter())
        .filter_map(observation_score);
    let first_score = scored_in_order.clone().next();
    let latest_score = scored_in_order.last();

    tracing::debug!(
        plant_id = %plant.id,
        periods = periods.len(),
        overall_trend = overall.as_str(),
        "Evolution view computed"
    );

    EvolutionView {
        plant_id: plant.id,
        total_observations: plant.observations.len(),
        periods,
        overall_trend: overall,
        first_score,
        latest_score,
    }
}
