use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::HealthAnalysis;

/// Reference to a stored plant photo (path or URL). Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `http(s)://` URL rather than a filesystem path.
    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single timestamped photo of a plant.
///
/// Only `health_analysis` may change after the observation is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub image_ref: ImageRef,
    pub health_analysis: Option<HealthAnalysis>,
    pub is_primary: bool,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, image_ref: ImageRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            image_ref,
            health_analysis: None,
            is_primary: false,
        }
    }

    pub fn with_analysis(mut self, analysis: HealthAnalysis) -> Self {
        self.health_analysis = Some(analysis);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub species: Option<String>,
    /// Cached projection of the latest observation's score, 0–100.
    pub health_score: f64,
    /// Chronological, append-mostly.
    pub observations: Vec<Observation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plant {
    /// Most recent observation by timestamp. On equal timestamps the one
    /// later in the list wins.
    pub fn latest_observation(&self) -> Option<&Observation> {
        self.observations.iter().max_by_key(|o| o.timestamp)
    }

    pub fn metadata(&self) -> PlantMetadata {
        PlantMetadata {
            plant_id: self.id,
            owner_id: self.owner_id,
            name: self.name.clone(),
            species: self.species.clone(),
        }
    }
}

/// Plant identity passed to the analysis service alongside the photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantMetadata {
    pub plant_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub species: Option<String>,
}

/// Input for creating a plant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlant {
    pub owner_id: Uuid,
    pub name: String,
    pub species: Option<String>,
    /// Starting score before any observation is analyzed.
    #[serde(default = "default_initial_score")]
    pub initial_score: f64,
}

fn default_initial_score() -> f64 {
    0.0
}

/// Editable plant fields. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlantUpdate {
    pub name: Option<String>,
    pub species: Option<Option<String>>,
}

impl PlantUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.species.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap()
    }

    fn plant_with(observations: Vec<Observation>) -> Plant {
        Plant {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Monstera".into(),
            species: Some("Monstera deliciosa".into()),
            health_score: 0.0,
            observations,
            created_at: at(1),
            updated_at: at(1),
        }
    }

    #[test]
    fn latest_observation_is_by_timestamp_not_position() {
        let newest = Observation::new(at(20), ImageRef::new("b.jpg"));
        let older = Observation::new(at(3), ImageRef::new("a.jpg"));
        let plant = plant_with(vec![newest.clone(), older]);
        assert_eq!(plant.latest_observation().unwrap().id, newest.id);
    }

    #[test]
    fn latest_observation_tie_prefers_later_entry() {
        let first = Observation::new(at(5), ImageRef::new("a.jpg"));
        let second = Observation::new(at(5), ImageRef::new("b.jpg"));
        let plant = plant_with(vec![first, second.clone()]);
        assert_eq!(plant.latest_observation().unwrap().id, second.id);
    }

    #[test]
    fn latest_observation_empty() {
        assert!(plant_with(vec![]).latest_observation().is_none());
    }

    #[test]
    fn metadata_copies_identity() {
        let plant = plant_with(vec![]);
        let meta = plant.metadata();
        assert_eq!(meta.plant_id, plant.id);
        assert_eq!(meta.owner_id, plant.owner_id);
        assert_eq!(meta.species.as_deref(), Some("Monstera deliciosa"));
    }

    #[test]
    fn image_ref_serializes_as_plain_string() {
        let json = serde_json::to_string(&ImageRef::new("photos/1.jpg")).unwrap();
        assert_eq!(json, "\"photos/1.jpg\"");
    }
}
