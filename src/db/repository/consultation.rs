use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::appointment::{get_appointment, set_appointment_status};
use super::patient::get_patient;
use super::user::get_user;
use crate::db::{timestamp, DatabaseError};
use crate::models::enums::{AppointmentStatus, ConsultationStatus};
use crate::models::*;

const CONSULTATION_COLUMNS: &str = "id, patient_id, doctor_id, appointment_id, consultation_date,
     doctor_remarks, cost, status, created_at, updated_at";

fn consultation_from_row(row: &Row<'_>) -> rusqlite::Result<Consultation> {
    Ok(Consultation {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        appointment_id: row.get(3)?,
        consultation_date: row.get(4)?,
        doctor_remarks: row.get(5)?,
        cost: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        patient: None,
        doctor: None,
        appointment: None,
    })
}

fn load_relations(conn: &Connection, consultation: &mut Consultation) -> Result<(), DatabaseError> {
    consultation.patient = get_patient(conn, consultation.patient_id)?;
    consultation.doctor = get_user(conn, consultation.doctor_id)?;
    consultation.appointment = match consultation.appointment_id {
        Some(id) => get_appointment(conn, id)?,
        None => None,
    };
    Ok(())
}

fn query_with_relations(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Consultation>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let mut consultations = stmt
        .query_map(params, consultation_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for consultation in &mut consultations {
        load_relations(conn, consultation)?;
    }
    Ok(consultations)
}

/// Insert a consultation. When it references an appointment, that
/// appointment is marked completed in the same transaction.
pub fn insert_consultation(
    conn: &Connection,
    consultation: &NewConsultation,
) -> Result<i64, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO consultations (patient_id, doctor_id, appointment_id, consultation_date,
                                    doctor_remarks, cost, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            consultation.patient_id,
            consultation.doctor_id,
            consultation.appointment_id,
            consultation.consultation_date,
            consultation.doctor_remarks,
            consultation.cost,
            consultation.status,
            timestamp(),
        ],
    )?;
    let id = tx.last_insert_rowid();
    if let Some(appointment_id) = consultation.appointment_id {
        set_appointment_status(&tx, appointment_id, AppointmentStatus::Completed)?;
    }
    tx.commit()?;
    Ok(id)
}

/// Turn an appointment into a completed consultation dated now.
/// Returns `None` when the appointment does not exist.
pub fn create_from_appointment(
    conn: &Connection,
    appointment_id: i64,
    doctor_remarks: &str,
    cost: f64,
) -> Result<Option<i64>, DatabaseError> {
    let Some(appointment) = get_appointment(conn, appointment_id)? else {
        return Ok(None);
    };
    let id = insert_consultation(
        conn,
        &NewConsultation {
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            appointment_id: Some(appointment.id),
            consultation_date: timestamp(),
            doctor_remarks: doctor_remarks.to_string(),
            cost,
            status: ConsultationStatus::Completed,
        },
    )?;
    Ok(Some(id))
}

pub fn get_consultation(
    conn: &Connection,
    id: i64,
) -> Result<Option<Consultation>, DatabaseError> {
    let sql = format!("SELECT {CONSULTATION_COLUMNS} FROM consultations WHERE id = ?1");
    conn.query_row(&sql, params![id], consultation_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

/// Consultation with patient, doctor and appointment.
pub fn get_consultation_with_relations(
    conn: &Connection,
    id: i64,
) -> Result<Option<Consultation>, DatabaseError> {
    let Some(mut consultation) = get_consultation(conn, id)? else {
        return Ok(None);
    };
    load_relations(conn, &mut consultation)?;
    Ok(Some(consultation))
}

pub fn list_consultations(conn: &Connection) -> Result<Vec<Consultation>, DatabaseError> {
    let sql = format!(
        "SELECT {CONSULTATION_COLUMNS} FROM consultations ORDER BY consultation_date DESC, id DESC"
    );
    query_with_relations(conn, &sql, [])
}

pub fn list_patient_consultations(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<Consultation>, DatabaseError> {
    let sql = format!(
        "SELECT {CONSULTATION_COLUMNS} FROM consultations
         WHERE patient_id = ?1
         ORDER BY consultation_date DESC, id DESC"
    );
    query_with_relations(conn, &sql, params![patient_id])
}

/// Consultations dated within `[start, end]`, both days inclusive,
/// oldest first.
pub fn consultations_between(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    patient_id: Option<i64>,
) -> Result<Vec<Consultation>, DatabaseError> {
    let sql = format!(
        "SELECT {CONSULTATION_COLUMNS} FROM consultations
         WHERE date(consultation_date) BETWEEN ?1 AND ?2
           AND (?3 IS NULL OR patient_id = ?3)
         ORDER BY consultation_date, id"
    );
    query_with_relations(conn, &sql, params![start, end, patient_id])
}

/// Returns `false` when the consultation does not exist.
pub fn update_consultation(
    conn: &Connection,
    id: i64,
    changes: &ConsultationChanges,
) -> Result<bool, DatabaseError> {
    let Some(mut consultation) = get_consultation(conn, id)? else {
        return Ok(false);
    };
    changes.apply(&mut consultation);
    conn.execute(
        "UPDATE consultations
         SET patient_id = ?2, doctor_id = ?3, appointment_id = ?4, consultation_date = ?5,
             doctor_remarks = ?6, cost = ?7, status = ?8, updated_at = ?9
         WHERE id = ?1",
        params![
            id,
            consultation.patient_id,
            consultation.doctor_id,
            consultation.appointment_id,
            consultation.consultation_date,
            consultation.doctor_remarks,
            consultation.cost,
            consultation.status,
            timestamp(),
        ],
    )?;
    Ok(true)
}

pub fn delete_consultation(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM consultations WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn count_consultations(conn: &Connection) -> Result<i64, DatabaseError> {
    conn.query_row("SELECT COUNT(*) FROM consultations", [], |row| row.get(0))
        .map_err(DatabaseError::from)
}
