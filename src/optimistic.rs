//! Local optimistic projection of plant state.
//!
//! A client applies a mutation locally before the server confirms it. Each
//! plant entry keeps the last server-confirmed value next to the current
//! one, so a failed mutation rolls back without a refetch. Plants created
//! offline keep their real id; there are no temporary ids to reconcile.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::Plant;

/// Sync status of a locally held value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState<T> {
    /// Applied locally, awaiting the server.
    Pending(T),
    /// Matches the server.
    Confirmed(T),
    /// The server rejected the change and there was nothing to roll back to.
    Failed { value: T, error: String },
}

impl<T> SyncState<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Pending(v) | Self::Confirmed(v) => v,
            Self::Failed { value, .. } => value,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// Current state plus the last confirmed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tracked<T> {
    pub state: SyncState<T>,
    pub last_confirmed: Option<T>,
}

impl<T: Clone> Tracked<T> {
    pub fn confirmed(value: T) -> Self {
        Self {
            last_confirmed: Some(value.clone()),
            state: SyncState::Confirmed(value),
        }
    }

    fn apply(&mut self, value: T) {
        self.state = SyncState::Pending(value);
    }

    fn confirm(&mut self, value: T) {
        self.last_confirmed = Some(value.clone());
        self.state = SyncState::Confirmed(value);
    }

    fn fail(&mut self, error: String) {
        self.state = match self.last_confirmed.clone() {
            Some(previous) => SyncState::Confirmed(previous),
            None => SyncState::Failed {
                value: self.state.value().clone(),
                error,
            },
        };
    }
}

/// Client-side view of an owner's plants.
#[derive(Debug, Default)]
pub struct LocalGarden {
    plants: HashMap<Uuid, Tracked<Plant>>,
}

impl LocalGarden {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a server listing; everything starts confirmed.
    pub fn from_confirmed(plants: impl IntoIterator<Item = Plant>) -> Self {
        Self {
            plants: plants
                .into_iter()
                .map(|p| (p.id, Tracked::confirmed(p)))
                .collect(),
        }
    }

    /// Apply a change locally ahead of the server. New plants have no
    /// confirmed value to roll back to.
    pub fn apply_optimistic(&mut self, plant: Plant) {
        match self.plants.get_mut(&plant.id) {
            Some(tracked) => tracked.apply(plant),
            None => {
                self.plants.insert(
                    plant.id,
                    Tracked {
                        state: SyncState::Pending(plant),
                        last_confirmed: None,
                    },
                );
            }
        }
    }

    /// Replace the pending value with what the server returned.
    pub fn confirm(&mut self, plant: Plant) {
        self.plants
            .entry(plant.id)
            .and_modify(|t| t.confirm(plant.clone()))
            .or_insert_with(|| Tracked::confirmed(plant));
    }

    /// Roll back to the last confirmed value, or flag the entry as failed.
    pub fn fail(&mut self, plant_id: &Uuid, error: impl Into<String>) {
        let error = error.into();
        match self.plants.get_mut(plant_id) {
            Some(tracked) => {
                tracing::warn!(plant_id = %plant_id, error = %error, "Optimistic change rejected");
                tracked.fail(error);
            }
            None => tracing::debug!(plant_id = %plant_id, "Failure for untracked plant ignored"),
        }
    }

    /// Drop a plant the server confirmed as deleted.
    pub fn remove(&mut self, plant_id: &Uuid) -> Option<Tracked<Plant>> {
        self.plants.remove(plant_id)
    }

    pub fn current(&self, plant_id: &Uuid) -> Option<&SyncState<Plant>> {
        self.plants.get(plant_id).map(|t| &t.state)
    }

    pub fn has_pending(&self) -> bool {
        self.plants.values().any(|t| t.state.is_pending())
    }

    pub fn len(&self) -> usize {
        self.plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn plant(name: &str, score: f64) -> Plant {
        let now = Utc::now();
        Plant {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            name: name.into(),
            species: None,
            health_score: score,
            observations: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn optimistic_update_then_confirm() {
        let original = plant("Fern", 60.0);
        let mut garden = LocalGarden::from_confirmed([original.clone()]);

        let mut edited = original.clone();
        edited.name = "Boston fern".into();
        garden.apply_optimistic(edited.clone());
        assert_eq!(garden.current(&original.id), Some(&SyncState::Pending(edited.clone())));
        assert!(garden.has_pending());

        garden.confirm(edited.clone());
        assert_eq!(garden.current(&original.id), Some(&SyncState::Confirmed(edited)));
        assert!(!garden.has_pending());
    }

    #[test]
    fn failure_rolls_back_to_last_confirmed() {
        let original = plant("Fern", 60.0);
        let mut garden = LocalGarden::from_confirmed([original.clone()]);

        let mut edited = original.clone();
        edited.health_score = 90.0;
        garden.apply_optimistic(edited);
        garden.fail(&original.id, "HTTP 500");

        assert_eq!(garden.current(&original.id), Some(&SyncState::Confirmed(original)));
    }

    #[test]
    fn failed_create_is_flagged_not_dropped() {
        let mut garden = LocalGarden::new();
        let fresh = plant("Orchid", 0.0);
        garden.apply_optimistic(fresh.clone());
        garden.fail(&fresh.id, "offline");

        match garden.current(&fresh.id) {
            Some(SyncState::Failed { value, error }) => {
                assert_eq!(value, &fresh);
                assert_eq!(error, "offline");
            }
            other => panic!("Expected Failed, got: {other:?}"),
        }
    }

    #[test]
    fn rollback_skips_intermediate_pending_values() {
        let original = plant("Cactus", 70.0);
        let mut garden = LocalGarden::from_confirmed([original.clone()]);

        for score in [75.0, 80.0] {
            let mut edited = original.clone();
            edited.health_score = score;
            garden.apply_optimistic(edited);
        }
        garden.fail(&original.id, "conflict");
        assert_eq!(garden.current(&original.id).map(|s| s.value().health_score), Some(70.0));
    }

    #[test]
    fn created_plant_keeps_its_id_through_confirmation() {
        let mut garden = LocalGarden::new();
        let fresh = plant("Aloe", 0.0);
        garden.apply_optimistic(fresh.clone());
        garden.confirm(fresh.clone());
        assert_eq!(garden.len(), 1);
        assert!(matches!(garden.current(&fresh.id), Some(SyncState::Confirmed(_))));
    }

    #[test]
    fn remove_and_unknown_failure() {
        let p = plant("Ivy", 50.0);
        let mut garden = LocalGarden::from_confirmed([p.clone()]);
        garden.fail(&Uuid::new_v4(), "ignored");
        assert_eq!(garden.len(), 1);
        assert!(garden.remove(&p.id).is_some());
        assert!(garden.is_empty());
    }

    #[test]
    fn state_serializes_with_tag() {
        let json = serde_json::to_value(SyncState::Failed {
            value: 1u8,
            error: "x".into(),
        })
        .unwrap();
        assert_eq!(json["state"], "failed");
    }
}
