use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::observation::list_observations;
use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::Plant;

/// Insert a plant row. Observations are inserted separately.
pub fn insert_plant(conn: &Connection, plant: &Plant) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO plants (id, owner_id, name, species, health_score, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            plant.id.to_string(),
            plant.owner_id.to_string(),
            plant.name,
            plant.species,
            plant.health_score,
            format_timestamp(&plant.created_at),
            format_timestamp(&plant.updated_at),
        ],
    )?;
    Ok(())
}

/// Load a plant with its observations in chronological order.
pub fn get_plant(conn: &Connection, id: &Uuid) -> Result<Option<Plant>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, owner_id, name, species, health_score, created_at, updated_at
             FROM plants WHERE id = ?1",
            params![id.to_string()],
            read_plant_row,
        )
        .optional()?;

    match row {
        Some(row) => {
            let observations = list_observations(conn, id)?;
            Ok(Some(plant_from_row(row, observations)?))
        }
        None => Ok(None),
    }
}

/// All plants owned by `owner_id`, oldest first, observations included.
pub fn list_plants_for_owner(conn: &Connection, owner_id: &Uuid) -> Result<Vec<Plant>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, name, species, health_score, created_at, updated_at
         FROM plants WHERE owner_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;
    let rows = stmt
        .query_map(params![owner_id.to_string()], read_plant_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|row| {
            let plant_id = parse_uuid(&row.id)?;
            let observations = list_observations(conn, &plant_id)?;
            plant_from_row(row, observations)
        })
        .collect()
}

/// Update name/species. Fails with NotFound if the plant does not exist.
pub fn update_plant_details(
    conn: &Connection,
    id: &Uuid,
    name: &str,
    species: Option<&str>,
    updated_at: &chrono::DateTime<chrono::Utc>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE plants SET name = ?2, species = ?3, updated_at = ?4 WHERE id = ?1",
        params![id.to_string(), name, species, format_timestamp(updated_at)],
    )?;
    ensure_found(changed, id)
}

pub fn update_plant_health_score(conn: &Connection, id: &Uuid, score: f64) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE plants SET health_score = ?2 WHERE id = ?1",
        params![id.to_string(), score],
    )?;
    ensure_found(changed, id)
}

/// Delete a plant; its observations go with it (ON DELETE CASCADE).
pub fn delete_plant(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM plants WHERE id = ?1", params![id.to_string()])?;
    ensure_found(changed, id)
}

fn ensure_found(changed: usize, id: &Uuid) -> Result<(), DatabaseError> {
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "plant".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for Plant mapping
struct PlantRow {
    id: String,
    owner_id: String,
    name: String,
    species: Option<String>,
    health_score: f64,
    created_at: String,
    updated_at: String,
}

fn read_plant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlantRow> {
    Ok(PlantRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        species: row.get(3)?,
        health_score: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn plant_from_row(row: PlantRow, observations: Vec<crate::models::Observation>) -> Result<Plant, DatabaseError> {
    Ok(Plant {
        id: parse_uuid(&row.id)?,
        owner_id: parse_uuid(&row.owner_id)?,
        name: row.name,
        species: row.species,
        health_score: row.health_score,
        observations,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}
