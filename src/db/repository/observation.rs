use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{HealthAnalysis, ImageRef, Observation};

/// Append an observation to a plant.
pub fn insert_observation(
    conn: &Connection,
    plant_id: &Uuid,
    obs: &Observation,
) -> Result<(), DatabaseError> {
    let analysis_json = obs
        .health_analysis
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO observations (id, plant_id, taken_at, image_ref, health_analysis, is_primary)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            obs.id.to_string(),
            plant_id.to_string(),
            format_timestamp(&obs.timestamp),
            obs.image_ref.as_str(),
            analysis_json,
            obs.is_primary as i32,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            DatabaseError::NotFound {
                entity_type: "plant".into(),
                id: plant_id.to_string(),
            }
        }
        other => other.into(),
    })?;
    Ok(())
}

/// Observations of a plant, oldest first; ties keep insertion order.
pub fn list_observations(conn: &Connection, plant_id: &Uuid) -> Result<Vec<Observation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, taken_at, image_ref, health_analysis, is_primary
         FROM observations
         WHERE plant_id = ?1
         ORDER BY taken_at ASC, rowid ASC",
    )?;
    let rows = stmt
        .query_map(params![plant_id.to_string()], |row| {
            Ok(ObservationRow {
                id: row.get(0)?,
                taken_at: row.get(1)?,
                image_ref: row.get(2)?,
                health_analysis: row.get(3)?,
                is_primary: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(observation_from_row).collect()
}

/// Attach or replace the analysis on an observation.
pub fn update_observation_analysis(
    conn: &Connection,
    observation_id: &Uuid,
    analysis: &HealthAnalysis,
) -> Result<(), DatabaseError> {
    let json = serde_json::to_string(analysis)?;
    let changed = conn.execute(
        "UPDATE observations SET health_analysis = ?2 WHERE id = ?1",
        params![observation_id.to_string(), json],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "observation".into(),
            id: observation_id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for Observation mapping
struct ObservationRow {
    id: String,
    taken_at: String,
    image_ref: String,
    health_analysis: Option<String>,
    is_primary: i32,
}

fn observation_from_row(row: ObservationRow) -> Result<Observation, DatabaseError> {
    let health_analysis = row
        .health_analysis
        .as_deref()
        .map(serde_json::from_str::<HealthAnalysis>)
        .transpose()?;

    Ok(Observation {
        id: parse_uuid(&row.id)?,
        timestamp: parse_timestamp(&row.taken_at)?,
        image_ref: ImageRef(row.image_ref),
        health_analysis,
        is_primary: row.is_primary != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::insert_plant;
    use crate::models::{OverallHealth, Plant};
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (Connection, Plant) {
        let conn = open_memory_database().unwrap();
        let t = Utc.with_ymd_and_hms(2026, 4, 1, 7, 30, 0).unwrap();
        let plant = Plant {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Pothos".into(),
            species: None,
            health_score: 0.0,
            observations: vec![],
            created_at: t,
            updated_at: t,
        };
        insert_plant(&conn, &plant).unwrap();
        (conn, plant)
    }

    #[test]
    fn observations_come_back_in_time_order() {
        let (conn, plant) = setup();
        let late = Observation::new(plant.created_at + Duration::days(9), ImageRef::new("late.jpg"));
        let early = Observation::new(plant.created_at, ImageRef::new("early.jpg"));
        insert_observation(&conn, &plant.id, &late).unwrap();
        insert_observation(&conn, &plant.id, &early).unwrap();

        let loaded = list_observations(&conn, &plant.id).unwrap();
        assert_eq!(loaded, vec![early, late]);
    }

    #[test]
    fn analysis_is_stored_as_json_and_replaced() {
        let (conn, plant) = setup();
        let mut obs = Observation::new(plant.created_at, ImageRef::new("a.jpg"));
        obs.is_primary = true;
        insert_observation(&conn, &plant.id, &obs).unwrap();

        let analysis = HealthAnalysis {
            overall_health: Some(OverallHealth::Fair),
            confidence: Some(0.6),
            issues: vec![],
            recommendations: vec!["Water less often".into()],
        };
        update_observation_analysis(&conn, &obs.id, &analysis).unwrap();

        let loaded = list_observations(&conn, &plant.id).unwrap();
        assert_eq!(loaded[0].health_analysis.as_ref(), Some(&analysis));
        assert!(loaded[0].is_primary);
    }

    #[test]
    fn update_missing_observation_is_not_found() {
        let (conn, _) = setup();
        let err = update_observation_analysis(&conn, &Uuid::new_v4(), &HealthAnalysis::default())
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn observation_for_unknown_plant_is_rejected() {
        let (conn, plant) = setup();
        let obs = Observation::new(plant.created_at, ImageRef::new("x.jpg"));
        let err = insert_observation(&conn, &Uuid::new_v4(), &obs).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
