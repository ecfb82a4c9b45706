use rusqlite::{params, Connection, OptionalExtension, Row};

use super::dialysis::json_column;
use crate::db::{timestamp, DatabaseError};
use crate::models::*;

const PROTOCOL_COLUMNS: &str = "id, name, stage, recommendations, created_at, updated_at";

fn protocol_from_row(row: &Row<'_>) -> rusqlite::Result<MrcProtocol> {
    Ok(MrcProtocol {
        id: row.get(0)?,
        name: row.get(1)?,
        stage: row.get(2)?,
        recommendations: json_column(row, 3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn insert_protocol(conn: &Connection, protocol: &NewProtocol) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO mrc_protocols (name, stage, recommendations, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![
            protocol.name,
            protocol.stage,
            serde_json::to_string(&protocol.recommendations)?,
            timestamp(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_protocol(conn: &Connection, id: i64) -> Result<Option<MrcProtocol>, DatabaseError> {
    let sql = format!("SELECT {PROTOCOL_COLUMNS} FROM mrc_protocols WHERE id = ?1");
    conn.query_row(&sql, params![id], protocol_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn list_protocols(conn: &Connection) -> Result<Vec<MrcProtocol>, DatabaseError> {
    let sql = format!("SELECT {PROTOCOL_COLUMNS} FROM mrc_protocols ORDER BY stage, id");
    let mut stmt = conn.prepare(&sql)?;
    let protocols = stmt
        .query_map([], protocol_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(protocols)
}

pub fn update_protocol(
    conn: &Connection,
    id: i64,
    changes: &ProtocolChanges,
) -> Result<bool, DatabaseError> {
    let Some(mut protocol) = get_protocol(conn, id)? else {
        return Ok(false);
    };
    changes.apply(&mut protocol);
    conn.execute(
        "UPDATE mrc_protocols SET name = ?2, stage = ?3, recommendations = ?4, updated_at = ?5
         WHERE id = ?1",
        params![
            id,
            protocol.name,
            protocol.stage,
            serde_json::to_string(&protocol.recommendations)?,
            timestamp(),
        ],
    )?;
    Ok(true)
}

pub fn delete_protocol(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM mrc_protocols WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Assign a protocol to a patient. Re-assigning refreshes the assigning
/// user and timestamp.
pub fn assign_protocol(
    conn: &Connection,
    patient_id: i64,
    protocol_id: i64,
    assigned_by: Option<i64>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR REPLACE INTO patient_protocols (patient_id, protocol_id, assigned_by, assigned_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![patient_id, protocol_id, assigned_by, timestamp()],
    )?;
    Ok(())
}

pub fn list_patient_protocols(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<ProtocolAssignment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, p.stage, p.recommendations, p.created_at, p.updated_at,
                a.assigned_by, a.assigned_at
         FROM patient_protocols a
         JOIN mrc_protocols p ON p.id = a.protocol_id
         WHERE a.patient_id = ?1
         ORDER BY a.assigned_at, p.id",
    )?;
    let assignments = stmt
        .query_map(params![patient_id], |row| {
            Ok(ProtocolAssignment {
                protocol: protocol_from_row(row)?,
                assigned_by: row.get(6)?,
                assigned_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(assignments)
}
