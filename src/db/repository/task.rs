use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{timestamp, DatabaseError};
use crate::models::*;

const TASK_COLUMNS: &str = "id, type, description, status, created_at, updated_at";

pub(crate) fn task_from_row(row: &Row<'_>) -> rusqlite::Result<AppointmentTask> {
    Ok(AppointmentTask {
        id: row.get(0)?,
        task_type: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn insert_task(conn: &Connection, task: &NewTask) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO appointment_tasks (type, description, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![task.task_type, task.description, task.status, timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_task(conn: &Connection, id: i64) -> Result<Option<AppointmentTask>, DatabaseError> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM appointment_tasks WHERE id = ?1");
    conn.query_row(&sql, params![id], task_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn list_tasks(conn: &Connection) -> Result<Vec<AppointmentTask>, DatabaseError> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM appointment_tasks ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map([], task_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

/// Ids from `ids` that have no matching task row, in input order.
pub fn missing_task_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<i64>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT 1 FROM appointment_tasks WHERE id = ?1")?;
    let mut missing = Vec::new();
    for id in ids {
        let found: Option<i64> = stmt.query_row(params![id], |row| row.get(0)).optional()?;
        if found.is_none() {
            missing.push(*id);
        }
    }
    Ok(missing)
}
