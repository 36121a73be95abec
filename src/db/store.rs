//! Connection-owning SQLite store shared by the garden service and the
//! diagnosis orchestrator.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use super::repository;
use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::diagnosis::PersistenceGateway;
use crate::garden::PlantStore;
use crate::models::{HealthAnalysis, Observation, Plant};

pub struct SqlitePlantStore {
    conn: Mutex<Connection>,
}

impl SqlitePlantStore {
    /// Open (and migrate) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
        })
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

impl PlantStore for SqlitePlantStore {
    fn insert_plant(&self, plant: &Plant) -> Result<(), DatabaseError> {
        repository::insert_plant(&*self.conn()?, plant)
    }

    fn get_plant(&self, id: &Uuid) -> Result<Option<Plant>, DatabaseError> {
        repository::get_plant(&*self.conn()?, id)
    }

    fn list_plants_for_owner(&self, owner_id: &Uuid) -> Result<Vec<Plant>, DatabaseError> {
        repository::list_plants_for_owner(&*self.conn()?, owner_id)
    }

    fn update_details(
        &self,
        id: &Uuid,
        name: &str,
        species: Option<&str>,
        updated_at: &DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        repository::update_plant_details(&*self.conn()?, id, name, species, updated_at)
    }

    fn delete_plant(&self, id: &Uuid) -> Result<(), DatabaseError> {
        repository::delete_plant(&*self.conn()?, id)
    }

    fn insert_observation(&self, plant_id: &Uuid, observation: &Observation) -> Result<(), DatabaseError> {
        repository::insert_observation(&*self.conn()?, plant_id, observation)
    }
}

impl PersistenceGateway for SqlitePlantStore {
    fn update_observation_analysis(
        &self,
        observation_id: &Uuid,
        analysis: &HealthAnalysis,
    ) -> Result<(), DatabaseError> {
        repository::update_observation_analysis(&*self.conn()?, observation_id, analysis)
    }

    fn update_plant_health_score(&self, plant_id: &Uuid, score: f64) -> Result<(), DatabaseError> {
        repository::update_plant_health_score(&*self.conn()?, plant_id, score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageRef, OverallHealth};

    fn plant() -> Plant {
        let now = Utc::now();
        Plant {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Ficus".into(),
            species: None,
            health_score: 0.0,
            observations: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn gateway_writes_are_visible_through_store() {
        let store = SqlitePlantStore::in_memory().unwrap();
        let p = plant();
        store.insert_plant(&p).unwrap();
        let obs = Observation::new(Utc::now(), ImageRef::new("a.jpg"));
        store.insert_observation(&p.id, &obs).unwrap();

        let analysis = HealthAnalysis {
            overall_health: Some(OverallHealth::Good),
            ..Default::default()
        };
        store.update_observation_analysis(&obs.id, &analysis).unwrap();
        store.update_plant_health_score(&p.id, 80.0).unwrap();

        let loaded = store.get_plant(&p.id).unwrap().unwrap();
        assert_eq!(loaded.health_score, 80.0);
        assert_eq!(loaded.observations[0].health_analysis, Some(analysis));
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("garden.db");
        let p = plant();
        {
            let store = SqlitePlantStore::open(&path).unwrap();
            store.insert_plant(&p).unwrap();
        }
        let store = SqlitePlantStore::open(&path).unwrap();
        assert_eq!(store.list_plants_for_owner(&p.owner_id).unwrap().len(), 1);
    }

    #[test]
    fn score_update_for_missing_plant_is_not_found() {
        let store = SqlitePlantStore::in_memory().unwrap();
        assert!(matches!(
            store.update_plant_health_score(&Uuid::new_v4(), 50.0),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
