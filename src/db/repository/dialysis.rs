use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{timestamp, DatabaseError};
use crate::models::*;

const STEP_COLUMNS: &str =
    "id, patient_id, type, start_time, duration_minutes, parameters, notes, created_at, updated_at";

/// Read a TEXT column holding a JSON document.
pub(crate) fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn step_from_row(row: &Row<'_>) -> rusqlite::Result<DialysisStep> {
    Ok(DialysisStep {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        step_type: row.get(2)?,
        start_time: row.get(3)?,
        duration_minutes: row.get(4)?,
        parameters: json_column(row, 5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn insert_dialysis_step(
    conn: &Connection,
    patient_id: i64,
    step: &NewDialysisStep,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO dialysis_steps (patient_id, type, start_time, duration_minutes, parameters,
                                     notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            patient_id,
            step.step_type,
            step.start_time,
            step.duration_minutes,
            serde_json::to_string(&step.parameters)?,
            step.notes,
            timestamp(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_dialysis_step(
    conn: &Connection,
    id: i64,
) -> Result<Option<DialysisStep>, DatabaseError> {
    let sql = format!("SELECT {STEP_COLUMNS} FROM dialysis_steps WHERE id = ?1");
    conn.query_row(&sql, params![id], step_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

/// Steps for one patient, most recent session first.
pub fn list_patient_dialysis_steps(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<DialysisStep>, DatabaseError> {
    let sql = format!(
        "SELECT {STEP_COLUMNS} FROM dialysis_steps
         WHERE patient_id = ?1
         ORDER BY start_time DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let steps = stmt
        .query_map(params![patient_id], step_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(steps)
}

pub fn update_dialysis_step(
    conn: &Connection,
    id: i64,
    changes: &DialysisStepChanges,
) -> Result<bool, DatabaseError> {
    let Some(mut step) = get_dialysis_step(conn, id)? else {
        return Ok(false);
    };
    changes.apply(&mut step);
    conn.execute(
        "UPDATE dialysis_steps
         SET type = ?2, start_time = ?3, duration_minutes = ?4, parameters = ?5, notes = ?6,
             updated_at = ?7
         WHERE id = ?1",
        params![
            id,
            step.step_type,
            step.start_time,
            step.duration_minutes,
            serde_json::to_string(&step.parameters)?,
            step.notes,
            timestamp(),
        ],
    )?;
    Ok(true)
}

pub fn delete_dialysis_step(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM dialysis_steps WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}
