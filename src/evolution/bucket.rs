use chrono::Duration;

use crate::config::EVOLUTION_WINDOW_DAYS;
use crate::models::{Observation, Trend};
use crate::scoring::observation_score;
use super::types::EvolutionPeriod;

/// Groups observations into consecutive periods of at most
/// `EVOLUTION_WINDOW_DAYS`, each anchored at its first observation.
///
/// Input order does not matter; observations are stably sorted by timestamp
/// first. The returned periods partition the input: every observation lands
/// in exactly one period, periods are ordered and never overlap.
pub fn bucket(observations: &[Observation]) -> Vec<EvolutionPeriod> {
    let mut sorted: Vec<&Observation> = observations.iter().collect();
    sorted.sort_by_key(|o| o.timestamp);

    let Some(first) = sorted.first() else {
        return Vec::new();
    };

    let window = Duration::days(EVOLUTION_WINDOW_DAYS);
    let mut period_start = first.timestamp;
    let mut current: Vec<Observation> = Vec::new();
    let mut periods: Vec<EvolutionPeriod> = Vec::new();

    for observation in sorted {
        if observation.timestamp - period_start > window {
            periods.push(close_period(std::mem::take(&mut current)));
            period_start = observation.timestamp;
        }
        current.push(observation.clone());
    }
    periods.push(close_period(current));

    assign_trends(&mut periods);
    periods
}

/// Builds a period from a non-empty, time-ordered bucket. Trend is filled in
/// afterwards by `assign_trends`.
fn close_period(observations: Vec<Observation>) -> EvolutionPeriod {
    let scores: Vec<f64> = observations.iter().filter_map(observation_score).collect();
    let average_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    let start_date = observations.first().map(|o| o.timestamp).unwrap_or_default();
    let end_date = observations.last().map(|o| o.timestamp).unwrap_or(start_date);

    EvolutionPeriod {
        start_date,
        end_date,
        photo_count: observations.len(),
        scored_count: scores.len(),
        observations,
        average_score,
        trend: Trend::Stable,
    }
}

/// First period is stable. Later periods are improving only on a strict
/// increase over their predecessor; an equal average counts as declining.
fn assign_trends(periods: &mut [EvolutionPeriod]) {
    for i in 1..periods.len() {
        let previous = periods[i - 1].average_score;
        periods[i].trend = if periods[i].average_score > previous {
            Trend::Improving
        } else {
            Trend::Declining
        };
    }
}
