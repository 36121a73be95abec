//! Plant lifecycle service.
//!
//! Every mutation persists through the [`PlantStore`] and then evicts the
//! owner's cached aggregates before returning. Reads of the evolution view
//! are always computed fresh; the garden summary is read-through cached.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::aggregates::{compute_garden_summary, AggregateInvalidator, InMemoryAggregateCache, MutationEvent};
use crate::config::{self, AnalysisConfig};
use crate::db::{DatabaseError, SqlitePlantStore};
use crate::diagnosis::{
    AnalysisCapability, AnalysisError, CallerAuth, DiagnosisError, DiagnosisOrchestrator, DiagnosisOutcome,
    ImageAccess, ImageProbe, OllamaPlantAnalyzer, OllamaVisionClient, PersistenceGateway,
};
use crate::evolution::{evolution_view, EvolutionView};
use crate::models::{GardenSummary, ImageRef, NewPlant, Observation, Plant, PlantUpdate};

#[derive(Error, Debug)]
pub enum GardenError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Diagnosis(#[from] DiagnosisError),

    #[error("Analysis setup failed: {0}")]
    AnalysisSetup(#[from] AnalysisError),

    #[error("Plant not found: {0}")]
    PlantNotFound(Uuid),

    #[error("Plant {plant_id} does not belong to the caller")]
    NotOwner { plant_id: Uuid },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Plant persistence used by the service.
pub trait PlantStore: Send + Sync {
    fn insert_plant(&self, plant: &Plant) -> Result<(), DatabaseError>;
    fn get_plant(&self, id: &Uuid) -> Result<Option<Plant>, DatabaseError>;
    fn list_plants_for_owner(&self, owner_id: &Uuid) -> Result<Vec<Plant>, DatabaseError>;
    fn update_details(
        &self,
        id: &Uuid,
        name: &str,
        species: Option<&str>,
        updated_at: &DateTime<Utc>,
    ) -> Result<(), DatabaseError>;
    fn delete_plant(&self, id: &Uuid) -> Result<(), DatabaseError>;
    fn insert_observation(&self, plant_id: &Uuid, observation: &Observation) -> Result<(), DatabaseError>;
}

pub struct GardenService {
    store: Arc<dyn PlantStore>,
    orchestrator: DiagnosisOrchestrator,
    cache: Arc<InMemoryAggregateCache>,
    invalidator: AggregateInvalidator,
}

impl GardenService {
    /// Wire a service around one store that also serves as the diagnosis
    /// persistence gateway.
    pub fn new<S>(
        store: Arc<S>,
        analyzer: Arc<dyn AnalysisCapability>,
        probe: Arc<dyn ImageProbe>,
    ) -> Self
    where
        S: PlantStore + PersistenceGateway + 'static,
    {
        let cache = Arc::new(InMemoryAggregateCache::new());
        let invalidator = AggregateInvalidator::new(cache.clone());
        let orchestrator = DiagnosisOrchestrator::new(analyzer, store.clone(), probe, invalidator.clone());
        Self {
            store,
            orchestrator,
            cache,
            invalidator,
        }
    }

    /// Production wiring: SQLite at `db_path`, photos under the app data
    /// directory, Ollama vision analysis.
    pub fn open(db_path: &Path, analysis: &AnalysisConfig) -> Result<Self, GardenError> {
        let store = Arc::new(SqlitePlantStore::open(db_path)?);
        let images = Arc::new(ImageAccess::new(Some(config::photos_dir()))?);
        let client = Arc::new(OllamaVisionClient::from_config(analysis)?);
        let analyzer = Arc::new(OllamaPlantAnalyzer::new(client, images.clone(), analysis.model.clone()));

        tracing::info!(
            db = %db_path.display(),
            ollama = %analysis.base_url,
            model = %analysis.model,
            "Garden service ready"
        );
        Ok(Self::new(store, analyzer, images))
    }

    pub fn cache(&self) -> &Arc<InMemoryAggregateCache> {
        &self.cache
    }

    // ── Mutations ────────────────────────────────────────

    pub fn create_plant(&self, input: NewPlant) -> Result<Plant, GardenError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(GardenError::InvalidInput("plant name is empty".into()));
        }
        if !(0.0..=100.0).contains(&input.initial_score) {
            return Err(GardenError::InvalidInput(format!(
                "initial score {} is outside 0-100",
                input.initial_score
            )));
        }

        let now = now();
        let plant = Plant {
            id: Uuid::new_v4(),
            owner_id: input.owner_id,
            name: name.to_string(),
            species: input.species.filter(|s| !s.trim().is_empty()),
            health_score: input.initial_score,
            observations: vec![],
            created_at: now,
            updated_at: now,
        };
        self.store.insert_plant(&plant)?;
        self.invalidator.record(&MutationEvent::PlantCreated {
            owner_id: plant.owner_id,
            plant_id: plant.id,
        });

        tracing::info!(plant_id = %plant.id, owner_id = %plant.owner_id, "Plant created");
        Ok(plant)
    }

    pub fn update_plant(&self, plant_id: &Uuid, update: PlantUpdate) -> Result<Plant, GardenError> {
        let mut plant = self.load(plant_id)?;
        if update.is_empty() {
            return Ok(plant);
        }

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(GardenError::InvalidInput("plant name is empty".into()));
            }
            plant.name = name.to_string();
        }
        if let Some(species) = update.species {
            plant.species = species.filter(|s| !s.trim().is_empty());
        }
        plant.updated_at = now();

        self.store
            .update_details(&plant.id, &plant.name, plant.species.as_deref(), &plant.updated_at)?;
        self.invalidator.record(&MutationEvent::PlantUpdated {
            owner_id: plant.owner_id,
            plant_id: plant.id,
        });
        Ok(plant)
    }

    pub fn delete_plant(&self, plant_id: &Uuid) -> Result<(), GardenError> {
        let plant = self.load(plant_id)?;
        self.store.delete_plant(&plant.id)?;
        self.invalidator.record(&MutationEvent::PlantDeleted {
            owner_id: plant.owner_id,
            plant_id: plant.id,
        });
        tracing::info!(plant_id = %plant.id, "Plant deleted");
        Ok(())
    }

    /// Record a new photo observation. `taken_at` defaults to now.
    pub fn add_observation(
        &self,
        plant_id: &Uuid,
        image_ref: ImageRef,
        taken_at: Option<DateTime<Utc>>,
    ) -> Result<Observation, GardenError> {
        if image_ref.as_str().trim().is_empty() {
            return Err(GardenError::InvalidInput("image reference is empty".into()));
        }
        let plant = self.load(plant_id)?;

        let mut observation = Observation::new(taken_at.unwrap_or_else(now), image_ref);
        observation.is_primary = plant.observations.is_empty();
        self.store.insert_observation(&plant.id, &observation)?;
        self.invalidator.record(&MutationEvent::ObservationAdded {
            owner_id: plant.owner_id,
            plant_id: plant.id,
            observation_id: observation.id,
        });
        Ok(observation)
    }

    /// Refresh the diagnosis of the plant's latest observation.
    pub fn update_diagnosis(&self, plant_id: &Uuid, auth: &CallerAuth) -> Result<DiagnosisOutcome, GardenError> {
        let plant = self.load(plant_id)?;
        if plant.owner_id != auth.owner_id {
            return Err(GardenError::NotOwner { plant_id: plant.id });
        }
        Ok(self.orchestrator.update_diagnosis(&plant, auth)?)
    }

    // ── Reads ────────────────────────────────────────────

    pub fn get_plant(&self, plant_id: &Uuid) -> Result<Plant, GardenError> {
        self.load(plant_id)
    }

    pub fn list_plants(&self, owner_id: &Uuid) -> Result<Vec<Plant>, GardenError> {
        Ok(self.store.list_plants_for_owner(owner_id)?)
    }

    pub fn evolution(&self, plant_id: &Uuid) -> Result<EvolutionView, GardenError> {
        Ok(evolution_view(&self.load(plant_id)?))
    }

    pub fn garden_summary(&self, owner_id: &Uuid) -> Result<GardenSummary, GardenError> {
        self.cache.summary_or_compute(*owner_id, || -> Result<GardenSummary, GardenError> {
            let plants = self.store.list_plants_for_owner(owner_id)?;
            Ok(compute_garden_summary(&plants))
        })
    }

    fn load(&self, plant_id: &Uuid) -> Result<Plant, GardenError> {
        self.store
            .get_plant(plant_id)?
            .ok_or(GardenError::PlantNotFound(*plant_id))
    }
}

/// Current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
