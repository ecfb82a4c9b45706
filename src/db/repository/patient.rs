use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{timestamp, DatabaseError};
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, first_name, last_name, date_of_birth, phone, address, sex, email,
     created_at, updated_at";

const ADMINISTRATIVE_COLUMNS: &str = "id, patient_id, registration_date, record_number, referring_doctor,
     emergency_contact_name, emergency_contact_phone, created_at, updated_at";

const MEDICAL_COLUMNS: &str = "id, patient_id, medical_history, current_treatments, mrc_stage, blood_group,
     created_at, updated_at";

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let date_of_birth: NaiveDate = row.get(3)?;
    Ok(Patient {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth,
        age: age_on(date_of_birth, today()),
        phone: row.get(4)?,
        address: row.get(5)?,
        sex: row.get(6)?,
        email: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        administrative_data: None,
        medical_data: None,
    })
}

fn administrative_from_row(row: &Row<'_>) -> rusqlite::Result<AdministrativeData> {
    Ok(AdministrativeData {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        registration_date: row.get(2)?,
        record_number: row.get(3)?,
        referring_doctor: row.get(4)?,
        emergency_contact_name: row.get(5)?,
        emergency_contact_phone: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn medical_from_row(row: &Row<'_>) -> rusqlite::Result<MedicalData> {
    Ok(MedicalData {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        medical_history: row.get(2)?,
        current_treatments: row.get(3)?,
        mrc_stage: row.get(4)?,
        blood_group: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert a patient together with its administrative and medical records.
/// All three rows are written in one transaction.
pub fn insert_patient(
    conn: &Connection,
    patient: &NewPatient,
    administrative: &NewAdministrativeData,
    medical: &NewMedicalData,
) -> Result<i64, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let now = timestamp();

    tx.execute(
        "INSERT INTO patients (first_name, last_name, date_of_birth, phone, address, sex, email,
                               created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            patient.first_name,
            patient.last_name,
            patient.date_of_birth,
            patient.phone,
            patient.address,
            patient.sex,
            patient.email,
            now,
        ],
    )?;
    let patient_id = tx.last_insert_rowid();

    tx.execute(
        "INSERT INTO administrative_data (patient_id, registration_date, record_number,
                                          referring_doctor, emergency_contact_name,
                                          emergency_contact_phone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            patient_id,
            administrative.registration_date,
            administrative.record_number,
            administrative.referring_doctor,
            administrative.emergency_contact_name,
            administrative.emergency_contact_phone,
            now,
        ],
    )?;

    tx.execute(
        "INSERT INTO medical_data (patient_id, medical_history, current_treatments, mrc_stage,
                                   blood_group, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            patient_id,
            medical.medical_history,
            medical.current_treatments,
            medical.mrc_stage,
            medical.blood_group,
            now,
        ],
    )?;

    tx.commit()?;
    Ok(patient_id)
}

/// Patient row only, without sub-records.
pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1");
    conn.query_row(&sql, params![id], patient_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

/// Patient with administrative and medical data eager-loaded.
pub fn get_patient_with_records(
    conn: &Connection,
    id: i64,
) -> Result<Option<Patient>, DatabaseError> {
    let Some(mut patient) = get_patient(conn, id)? else {
        return Ok(None);
    };
    patient.administrative_data = get_administrative_data(conn, id)?;
    patient.medical_data = get_medical_data(conn, id)?;
    Ok(Some(patient))
}

pub fn patient_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM patients WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// All patients, ordered by id, with sub-records attached.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let mut patients = stmt
        .query_map([], patient_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut administrative: HashMap<i64, AdministrativeData> = {
        let sql = format!("SELECT {ADMINISTRATIVE_COLUMNS} FROM administrative_data");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], administrative_from_row)?;
        rows.map(|r| r.map(|d| (d.patient_id, d)))
            .collect::<Result<_, _>>()?
    };
    let mut medical: HashMap<i64, MedicalData> = {
        let sql = format!("SELECT {MEDICAL_COLUMNS} FROM medical_data");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], medical_from_row)?;
        rows.map(|r| r.map(|d| (d.patient_id, d)))
            .collect::<Result<_, _>>()?
    };

    for patient in &mut patients {
        patient.administrative_data = administrative.remove(&patient.id);
        patient.medical_data = medical.remove(&patient.id);
    }
    Ok(patients)
}

pub fn get_administrative_data(
    conn: &Connection,
    patient_id: i64,
) -> Result<Option<AdministrativeData>, DatabaseError> {
    let sql = format!("SELECT {ADMINISTRATIVE_COLUMNS} FROM administrative_data WHERE patient_id = ?1");
    conn.query_row(&sql, params![patient_id], administrative_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn get_medical_data(
    conn: &Connection,
    patient_id: i64,
) -> Result<Option<MedicalData>, DatabaseError> {
    let sql = format!("SELECT {MEDICAL_COLUMNS} FROM medical_data WHERE patient_id = ?1");
    conn.query_row(&sql, params![patient_id], medical_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

/// True when another patient already holds `record_number`.
pub fn record_number_taken(
    conn: &Connection,
    record_number: &str,
    except_patient: Option<i64>,
) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT patient_id FROM administrative_data
             WHERE record_number = ?1 AND patient_id != COALESCE(?2, -1)",
            params![record_number, except_patient],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Apply a partial update to the patient and, when requested, its
/// sub-records. Returns `false` when the patient does not exist.
pub fn update_patient(
    conn: &Connection,
    id: i64,
    changes: &PatientChanges,
) -> Result<bool, DatabaseError> {
    let Some(mut patient) = get_patient(conn, id)? else {
        return Ok(false);
    };
    changes.apply(&mut patient);

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE patients
         SET first_name = ?2, last_name = ?3, date_of_birth = ?4, phone = ?5, address = ?6,
             sex = ?7, email = ?8, updated_at = ?9
         WHERE id = ?1",
        params![
            id,
            patient.first_name,
            patient.last_name,
            patient.date_of_birth,
            patient.phone,
            patient.address,
            patient.sex,
            patient.email,
            timestamp(),
        ],
    )?;
    if !changes.administrative.is_empty() {
        update_administrative_data(&tx, id, &changes.administrative)?;
    }
    if !changes.medical.is_empty() {
        update_medical_data(&tx, id, &changes.medical)?;
    }
    tx.commit()?;
    Ok(true)
}

/// Returns `false` when the patient has no administrative record.
pub fn update_administrative_data(
    conn: &Connection,
    patient_id: i64,
    changes: &AdministrativeChanges,
) -> Result<bool, DatabaseError> {
    let Some(mut data) = get_administrative_data(conn, patient_id)? else {
        return Ok(false);
    };
    changes.apply(&mut data);
    conn.execute(
        "UPDATE administrative_data
         SET registration_date = ?2, record_number = ?3, referring_doctor = ?4,
             emergency_contact_name = ?5, emergency_contact_phone = ?6, updated_at = ?7
         WHERE patient_id = ?1",
        params![
            patient_id,
            data.registration_date,
            data.record_number,
            data.referring_doctor,
            data.emergency_contact_name,
            data.emergency_contact_phone,
            timestamp(),
        ],
    )?;
    Ok(true)
}

/// Returns `false` when the patient has no medical record.
pub fn update_medical_data(
    conn: &Connection,
    patient_id: i64,
    changes: &MedicalChanges,
) -> Result<bool, DatabaseError> {
    let Some(mut data) = get_medical_data(conn, patient_id)? else {
        return Ok(false);
    };
    changes.apply(&mut data);
    conn.execute(
        "UPDATE medical_data
         SET medical_history = ?2, current_treatments = ?3, mrc_stage = ?4, blood_group = ?5,
             updated_at = ?6
         WHERE patient_id = ?1",
        params![
            patient_id,
            data.medical_history,
            data.current_treatments,
            data.mrc_stage,
            data.blood_group,
            timestamp(),
        ],
    )?;
    Ok(true)
}

/// Hard delete. Sub-records, appointments, consultations, dialysis steps
/// and protocol assignments go with it through `ON DELETE CASCADE`.
pub fn delete_patient(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
        .map_err(DatabaseError::from)
}
