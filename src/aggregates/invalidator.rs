use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cache::CacheStore;

/// Mutations that make an owner's aggregates stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationEvent {
    PlantCreated { owner_id: Uuid, plant_id: Uuid },
    PlantUpdated { owner_id: Uuid, plant_id: Uuid },
    PlantDeleted { owner_id: Uuid, plant_id: Uuid },
    ObservationAdded { owner_id: Uuid, plant_id: Uuid, observation_id: Uuid },
    DiagnosisUpdated { owner_id: Uuid, plant_id: Uuid, observation_id: Uuid },
}

impl MutationEvent {
    pub fn owner_id(&self) -> Uuid {
        match *self {
            Self::PlantCreated { owner_id, .. }
            | Self::PlantUpdated { owner_id, .. }
            | Self::PlantDeleted { owner_id, .. }
            | Self::ObservationAdded { owner_id, .. }
            | Self::DiagnosisUpdated { owner_id, .. } => owner_id,
        }
    }

    pub fn plant_id(&self) -> Uuid {
        match *self {
            Self::PlantCreated { plant_id, .. }
            | Self::PlantUpdated { plant_id, .. }
            | Self::PlantDeleted { plant_id, .. }
            | Self::ObservationAdded { plant_id, .. }
            | Self::DiagnosisUpdated { plant_id, .. } => plant_id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlantCreated { .. } => "plant_created",
            Self::PlantUpdated { .. } => "plant_updated",
            Self::PlantDeleted { .. } => "plant_deleted",
            Self::ObservationAdded { .. } => "observation_added",
            Self::DiagnosisUpdated { .. } => "diagnosis_updated",
        }
    }
}

/// Evicts owner-keyed aggregates from every registered cache store.
///
/// Call [`AggregateInvalidator::record`] after a mutation lands and before
/// returning to the caller.
#[derive(Clone, Default)]
pub struct AggregateInvalidator {
    stores: Vec<Arc<dyn CacheStore>>,
}

impl AggregateInvalidator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { stores: vec![store] }
    }

    /// Register an additional store (e.g. a separate suggestion cache).
    pub fn with_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.stores.push(store);
        self
    }

    /// Drop all cached aggregates for the owner. Idempotent.
    pub fn invalidate(&self, owner_id: &Uuid) {
        for store in &self.stores {
            store.invalidate(owner_id);
        }
    }

    /// Invalidate in response to a mutation.
    pub fn record(&self, event: &MutationEvent) {
        tracing::debug!(
            event = event.as_str(),
            owner_id = %event.owner_id(),
            plant_id = %event.plant_id(),
            "Invalidating owner aggregates"
        );
        self.invalidate(&event.owner_id());
    }
}
