use std::collections::BTreeSet;

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::patient::get_patient;
use super::task::task_from_row;
use super::user::get_user;
use crate::db::{timestamp, DatabaseError};
use crate::models::enums::AppointmentStatus;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, doctor_id, date, status, notes, created_at, updated_at";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        date: row.get(3)?,
        status: row.get(4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        patient: None,
        doctor: None,
        tasks: None,
    })
}

/// Insert a scheduled appointment and attach `task_ids`, assigned by the
/// appointment's doctor.
pub fn insert_appointment(
    conn: &Connection,
    appointment: &NewAppointment,
) -> Result<i64, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO appointments (patient_id, doctor_id, date, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            appointment.patient_id,
            appointment.doctor_id,
            appointment.date,
            AppointmentStatus::Scheduled,
            appointment.notes,
            timestamp(),
        ],
    )?;
    let id = tx.last_insert_rowid();
    for task_id in &appointment.task_ids {
        attach_task(&tx, id, *task_id, appointment.doctor_id)?;
    }
    tx.commit()?;
    Ok(id)
}

/// Appointment row only.
pub fn get_appointment(conn: &Connection, id: i64) -> Result<Option<Appointment>, DatabaseError> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    conn.query_row(&sql, params![id], appointment_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

/// Appointment with patient, doctor and attached tasks.
pub fn get_appointment_with_relations(
    conn: &Connection,
    id: i64,
) -> Result<Option<Appointment>, DatabaseError> {
    let Some(mut appointment) = get_appointment(conn, id)? else {
        return Ok(None);
    };
    load_relations(conn, &mut appointment)?;
    Ok(Some(appointment))
}

pub fn list_appointments(conn: &Connection) -> Result<Vec<Appointment>, DatabaseError> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY date, id");
    let mut stmt = conn.prepare(&sql)?;
    let mut appointments = stmt
        .query_map([], appointment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for appointment in &mut appointments {
        load_relations(conn, appointment)?;
    }
    Ok(appointments)
}

fn load_relations(conn: &Connection, appointment: &mut Appointment) -> Result<(), DatabaseError> {
    appointment.patient = get_patient(conn, appointment.patient_id)?;
    appointment.doctor = get_user(conn, appointment.doctor_id)?;
    appointment.tasks = Some(tasks_for_appointment(conn, appointment.id)?);
    Ok(())
}

pub fn appointment_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM appointments WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Apply a partial update. When `task_ids` is present the attached set is
/// replaced: missing links are added, extra links removed, kept links keep
/// their original assignment. Returns `false` when the appointment does not exist.
pub fn update_appointment(
    conn: &Connection,
    id: i64,
    changes: &AppointmentChanges,
) -> Result<bool, DatabaseError> {
    let Some(mut appointment) = get_appointment(conn, id)? else {
        return Ok(false);
    };
    changes.apply(&mut appointment);

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE appointments
         SET patient_id = ?2, doctor_id = ?3, date = ?4, status = ?5, notes = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            id,
            appointment.patient_id,
            appointment.doctor_id,
            appointment.date,
            appointment.status,
            appointment.notes,
            timestamp(),
        ],
    )?;

    if let Some(task_ids) = &changes.task_ids {
        let wanted: BTreeSet<i64> = task_ids.iter().copied().collect();
        let current: BTreeSet<i64> = {
            let mut stmt = tx.prepare(
                "SELECT appointment_task_id FROM appointment_task_user WHERE appointment_id = ?1",
            )?;
            let ids = stmt
                .query_map(params![id], |row| row.get(0))?
                .collect::<Result<_, _>>()?;
            ids
        };
        for stale in current.difference(&wanted) {
            tx.execute(
                "DELETE FROM appointment_task_user
                 WHERE appointment_id = ?1 AND appointment_task_id = ?2",
                params![id, stale],
            )?;
        }
        for added in wanted.difference(&current) {
            attach_task(&tx, id, *added, appointment.doctor_id)?;
        }
    }

    tx.commit()?;
    Ok(true)
}

pub fn set_appointment_status(
    conn: &Connection,
    id: i64,
    status: AppointmentStatus,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, status, timestamp()],
    )?;
    Ok(updated > 0)
}

pub fn delete_appointment(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Link a task to an appointment. Re-attaching an existing pair replaces
/// the assigning user and timestamp instead of failing.
pub fn attach_task(
    conn: &Connection,
    appointment_id: i64,
    task_id: i64,
    user_id: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR REPLACE INTO appointment_task_user
             (appointment_id, appointment_task_id, user_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![appointment_id, task_id, user_id, timestamp()],
    )?;
    Ok(())
}

pub fn tasks_for_appointment(
    conn: &Connection,
    appointment_id: i64,
) -> Result<Vec<AssignedTask>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.type, t.description, t.status, t.created_at, t.updated_at,
                l.user_id, l.created_at
         FROM appointment_task_user l
         JOIN appointment_tasks t ON t.id = l.appointment_task_id
         WHERE l.appointment_id = ?1
         ORDER BY t.id",
    )?;
    let tasks = stmt
        .query_map(params![appointment_id], |row| {
            Ok(AssignedTask {
                task: task_from_row(row)?,
                user_id: row.get(6)?,
                assigned_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

pub fn count_appointments(conn: &Connection) -> Result<i64, DatabaseError> {
    conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))
        .map_err(DatabaseError::from)
}
