//! Health score normalization.
//!
//! Converts a qualitative [`HealthAnalysis`] into a single comparable number.
//! Every component that needs a score goes through [`normalize`]; the
//! category table below is the only place category scores are defined.
//!
//! The normalizer does not clamp. Trend math works on the raw signal and
//! anything shown to a user must pass through [`display_score`].

use crate::models::{HealthAnalysis, Observation, OverallHealth, Plant};

/// Fixed category → score table.
pub const HEALTH_SCORE_TABLE: [(OverallHealth, f64); 5] = [
    (OverallHealth::Excellent, 95.0),
    (OverallHealth::Good, 80.0),
    (OverallHealth::Fair, 60.0),
    (OverallHealth::Poor, 30.0),
    (OverallHealth::Critical, 20.0),
];

/// Table lookup. `None` for `Unknown`.
pub fn category_score(health: OverallHealth) -> Option<f64> {
    HEALTH_SCORE_TABLE
        .iter()
        .find(|(category, _)| *category == health)
        .map(|(_, score)| *score)
}

/// Derive a numeric score from an analysis.
///
/// Precedence: recognized category, then confidence (values `<= 1` are
/// fractions and scaled by 100), then nothing.
pub fn normalize(analysis: Option<&HealthAnalysis>) -> Option<f64> {
    let analysis = analysis?;

    if let Some(score) = analysis.overall_health.and_then(category_score) {
        return Some(score);
    }

    analysis
        .confidence
        .map(|c| if c <= 1.0 { c * 100.0 } else { c })
}

/// Score of a single observation, if its analysis yields one.
pub fn observation_score(observation: &Observation) -> Option<f64> {
    normalize(observation.health_analysis.as_ref())
}

/// Clamp a raw score into the displayable 0–100 range.
pub fn display_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 100.0)
}

/// Score to show for a plant, recomputed from its most recent observation.
///
/// The cached `health_score` can lag behind the latest analysis when the
/// score write failed after the analysis write, so it is only used when the
/// latest observation has nothing to derive a score from.
pub fn effective_health_score(plant: &Plant) -> f64 {
    let fresh = plant.latest_observation().and_then(observation_score);
    display_score(fresh.unwrap_or(plant.health_score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageRef;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn analysis(health: Option<OverallHealth>, confidence: Option<f64>) -> HealthAnalysis {
        HealthAnalysis {
            overall_health: health,
            confidence,
            ..Default::default()
        }
    }

    #[test]
    fn absent_analysis_has_no_score() {
        assert_eq!(normalize(None), None);
    }

    #[test]
    fn category_wins_over_confidence() {
        for (category, expected) in HEALTH_SCORE_TABLE {
            for confidence in [None, Some(0.1), Some(0.99), Some(42.0)] {
                let a = analysis(Some(category), confidence);
                assert_eq!(normalize(Some(&a)), Some(expected), "{category} / {confidence:?}");
            }
        }
    }

    #[test]
    fn table_values() {
        assert_eq!(category_score(OverallHealth::Excellent), Some(95.0));
        assert_eq!(category_score(OverallHealth::Good), Some(80.0));
        assert_eq!(category_score(OverallHealth::Fair), Some(60.0));
        assert_eq!(category_score(OverallHealth::Poor), Some(30.0));
        assert_eq!(category_score(OverallHealth::Critical), Some(20.0));
        assert_eq!(category_score(OverallHealth::Unknown), None);
    }

    #[test]
    fn fractional_confidence_is_scaled() {
        for c in [0.0, 0.25, 0.5, 0.8, 1.0] {
            let a = analysis(None, Some(c));
            assert_eq!(normalize(Some(&a)), Some(c * 100.0));
        }
    }

    #[test]
    fn percentage_confidence_is_kept() {
        for c in [1.5, 42.0, 77.7, 100.0] {
            let a = analysis(None, Some(c));
            assert_eq!(normalize(Some(&a)), Some(c));
        }
    }

    #[test]
    fn unknown_category_falls_through_to_confidence() {
        let a = analysis(Some(OverallHealth::Unknown), Some(0.65));
        assert_eq!(normalize(Some(&a)), Some(65.0));
    }

    #[test]
    fn nothing_to_score() {
        let a = analysis(Some(OverallHealth::Unknown), None);
        assert_eq!(normalize(Some(&a)), None);
        assert_eq!(normalize(Some(&HealthAnalysis::default())), None);
    }

    #[test]
    fn normalizer_does_not_clamp() {
        let a = analysis(None, Some(140.0));
        assert_eq!(normalize(Some(&a)), Some(140.0));
        assert_eq!(display_score(140.0), 100.0);
        assert_eq!(display_score(-3.0), 0.0);
        assert_eq!(display_score(f64::NAN), 0.0);
    }

    #[test]
    fn effective_score_prefers_latest_analysis() {
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 5, 9, 8, 0, 0).unwrap();
        let plant = Plant {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Fern".into(),
            species: None,
            // Stale cached scalar from before the last analysis landed.
            health_score: 80.0,
            observations: vec![
                Observation::new(t0, ImageRef::new("a.jpg"))
                    .with_analysis(analysis(Some(OverallHealth::Good), None)),
                Observation::new(t1, ImageRef::new("b.jpg"))
                    .with_analysis(analysis(Some(OverallHealth::Poor), None)),
            ],
            created_at: t0,
            updated_at: t1,
        };
        assert_eq!(effective_health_score(&plant), 30.0);
    }

    #[test]
    fn effective_score_falls_back_to_cached() {
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let plant = Plant {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Fern".into(),
            species: None,
            health_score: 55.0,
            observations: vec![Observation::new(t0, ImageRef::new("a.jpg"))],
            created_at: t0,
            updated_at: t0,
        };
        assert_eq!(effective_health_score(&plant), 55.0);
    }
}
