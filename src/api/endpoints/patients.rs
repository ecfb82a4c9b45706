//! Patient records with their administrative and medical sub-records.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::endpoints::reports::attachment;
use crate::api::error::ApiError;
use crate::api::extract::{IdPath, JsonBody};
use crate::api::types::{ApiContext, EntityResponse, MessageResponse};
use crate::db;
use crate::listing::{filter, ListQuery, Listing};
use crate::models::enums::BloodGroup;
use crate::models::{
    AdministrativeChanges, AdministrativeData, Consultation, MedicalChanges, MedicalData,
    NewAdministrativeData, NewMedicalData, NewPatient, Patient, PatientChanges,
};
use crate::report::patient_consultations_pdf;
use crate::validation::{
    int_in_range, is_valid_email, nullable, nullable_text, optional_text, parse_date,
    parse_datetime, parse_enum, present_text, required_text, FieldErrors,
};

const MIN_MRC_STAGE: i64 = 1;
const MAX_MRC_STAGE: i64 = 5;

fn patient_not_found() -> ApiError {
    ApiError::NotFound("Patient not found".into())
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub sex: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdministrativeFields {
    pub registration_date: Option<String>,
    pub referring_doctor: Option<String>,
    pub record_number: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub emergency_contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub emergency_contact_phone: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MedicalFields {
    #[serde(default, deserialize_with = "nullable")]
    pub medical_history: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", alias = "last_treatment")]
    pub current_treatments: Option<Option<String>>,
    #[serde(default, alias = "stage_mrc")]
    pub mrc_stage: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub blood_group: Option<Option<String>>,
}

/// Body of `POST /patients` and `PUT /patients/:id`: patient fields and
/// sub-record fields side by side.
#[derive(Debug, Default, Deserialize)]
pub struct PatientRequest {
    #[serde(flatten)]
    pub patient: PatientFields,
    #[serde(flatten)]
    pub administrative: AdministrativeFields,
    #[serde(flatten)]
    pub medical: MedicalFields,
}

fn validate_email(errors: &mut FieldErrors, email: Option<Option<String>>) -> Option<Option<String>> {
    let email = nullable_text(email)?;
    if let Some(address) = &email {
        if !is_valid_email(address) {
            errors.add("email", "The email field must be a valid email address.");
        }
    }
    Some(email)
}

fn validate_stage(errors: &mut FieldErrors, stage: i64) -> Option<u8> {
    int_in_range(errors, "mrc_stage", stage, MIN_MRC_STAGE, MAX_MRC_STAGE).map(|s| s as u8)
}

fn validate_blood_group(
    errors: &mut FieldErrors,
    blood_group: Option<Option<String>>,
) -> Option<Option<BloodGroup>> {
    nullable_text(blood_group)
        .map(|group| group.and_then(|g| parse_enum::<BloodGroup>(errors, "blood_group", &g)))
}

fn new_patient(errors: &mut FieldErrors, fields: PatientFields) -> Option<NewPatient> {
    let first_name = required_text(errors, "first_name", fields.first_name.as_deref());
    let last_name = required_text(errors, "last_name", fields.last_name.as_deref());
    let date_of_birth = required_text(errors, "date_of_birth", fields.date_of_birth.as_deref())
        .and_then(|raw| parse_date(errors, "date_of_birth", &raw));
    let phone = required_text(errors, "phone", fields.phone.as_deref());
    let address = required_text(errors, "address", fields.address.as_deref());
    let sex = required_text(errors, "sex", fields.sex.as_deref());
    let email = validate_email(errors, fields.email).flatten();

    Some(NewPatient {
        first_name: first_name?,
        last_name: last_name?,
        date_of_birth: date_of_birth?,
        phone: phone?,
        address: address?,
        sex: sex?,
        email,
    })
}

fn new_administrative(
    errors: &mut FieldErrors,
    fields: AdministrativeFields,
) -> Option<NewAdministrativeData> {
    let registration_date =
        required_text(errors, "registration_date", fields.registration_date.as_deref())
            .and_then(|raw| parse_datetime(errors, "registration_date", &raw));
    let referring_doctor =
        required_text(errors, "referring_doctor", fields.referring_doctor.as_deref());
    let record_number = optional_text(fields.record_number.as_deref())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Some(NewAdministrativeData {
        registration_date: registration_date?,
        referring_doctor: referring_doctor?,
        record_number,
        emergency_contact_name: nullable_text(fields.emergency_contact_name).flatten(),
        emergency_contact_phone: nullable_text(fields.emergency_contact_phone).flatten(),
    })
}

fn new_medical(errors: &mut FieldErrors, fields: MedicalFields) -> Option<NewMedicalData> {
    let mrc_stage = validate_stage(errors, fields.mrc_stage.unwrap_or(MIN_MRC_STAGE));
    let blood_group = validate_blood_group(errors, fields.blood_group).flatten();

    Some(NewMedicalData {
        medical_history: nullable_text(fields.medical_history).flatten(),
        current_treatments: nullable_text(fields.current_treatments).flatten(),
        mrc_stage: mrc_stage?,
        blood_group,
    })
}

fn patient_changes(errors: &mut FieldErrors, fields: PatientFields) -> PatientChanges {
    PatientChanges {
        first_name: present_text(errors, "first_name", fields.first_name.as_deref()),
        last_name: present_text(errors, "last_name", fields.last_name.as_deref()),
        date_of_birth: present_text(errors, "date_of_birth", fields.date_of_birth.as_deref())
            .and_then(|raw| parse_date(errors, "date_of_birth", &raw)),
        phone: present_text(errors, "phone", fields.phone.as_deref()),
        address: present_text(errors, "address", fields.address.as_deref()),
        sex: present_text(errors, "sex", fields.sex.as_deref()),
        email: validate_email(errors, fields.email),
        ..Default::default()
    }
}

fn administrative_changes(
    errors: &mut FieldErrors,
    fields: AdministrativeFields,
) -> AdministrativeChanges {
    AdministrativeChanges {
        registration_date: present_text(
            errors,
            "registration_date",
            fields.registration_date.as_deref(),
        )
        .and_then(|raw| parse_datetime(errors, "registration_date", &raw)),
        referring_doctor: present_text(
            errors,
            "referring_doctor",
            fields.referring_doctor.as_deref(),
        ),
        record_number: present_text(errors, "record_number", fields.record_number.as_deref()),
        emergency_contact_name: nullable_text(fields.emergency_contact_name),
        emergency_contact_phone: nullable_text(fields.emergency_contact_phone),
    }
}

fn medical_changes(errors: &mut FieldErrors, fields: MedicalFields) -> MedicalChanges {
    MedicalChanges {
        medical_history: nullable_text(fields.medical_history),
        current_treatments: nullable_text(fields.current_treatments),
        mrc_stage: fields.mrc_stage.and_then(|s| validate_stage(errors, s)),
        blood_group: validate_blood_group(errors, fields.blood_group),
    }
}

fn ensure_record_number_free(
    conn: &Connection,
    record_number: Option<&str>,
    patient_id: Option<i64>,
) -> Result<(), ApiError> {
    match record_number {
        Some(rn) if db::record_number_taken(conn, rn, patient_id)? => Err(ApiError::Conflict(
            format!("Record number {rn} is already assigned to another patient"),
        )),
        _ => Ok(()),
    }
}

fn load_patient(conn: &Connection, id: i64) -> Result<Patient, ApiError> {
    db::get_patient_with_records(conn, id)?.ok_or_else(patient_not_found)
}

/// `GET /patients`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<Patient>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patients = db::list_patients(&conn)?;
    Ok(Json(query.apply(patients)?))
}

/// `POST /patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    JsonBody(body): JsonBody<PatientRequest>,
) -> Result<(StatusCode, Json<EntityResponse<Patient>>), ApiError> {
    let mut errors = FieldErrors::new();
    let patient = new_patient(&mut errors, body.patient);
    let administrative = new_administrative(&mut errors, body.administrative);
    let medical = new_medical(&mut errors, body.medical);
    errors.finish()?;
    let (Some(patient), Some(administrative), Some(medical)) = (patient, administrative, medical)
    else {
        return Err(ApiError::Internal("validated patient fields missing".into()));
    };

    let conn = ctx.core.open_db()?;
    ensure_record_number_free(&conn, Some(&administrative.record_number), None)?;
    let id = db::insert_patient(&conn, &patient, &administrative, &medical)?;
    tracing::info!(patient_id = id, "Patient created");

    let created = load_patient(&conn, id)?;
    Ok((
        StatusCode::CREATED,
        Json(EntityResponse::new("Patient created successfully", "patient", created)),
    ))
}

/// `GET /patients/:id`
pub async fn show(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(load_patient(&conn, id)?))
}

/// `PUT /patients/:id` — patient fields and sub-record fields in one
/// partial update.
pub async fn update(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<PatientRequest>,
) -> Result<Json<EntityResponse<Patient>>, ApiError> {
    let mut errors = FieldErrors::new();
    let mut changes = patient_changes(&mut errors, body.patient);
    changes.administrative = administrative_changes(&mut errors, body.administrative);
    changes.medical = medical_changes(&mut errors, body.medical);
    errors.finish()?;

    let conn = ctx.core.open_db()?;
    if !db::patient_exists(&conn, id)? {
        return Err(patient_not_found());
    }
    ensure_record_number_free(&conn, changes.administrative.record_number.as_deref(), Some(id))?;
    db::update_patient(&conn, id, &changes)?;
    tracing::info!(patient_id = id, "Patient updated");

    Ok(Json(EntityResponse::new(
        "Patient updated successfully",
        "patient",
        load_patient(&conn, id)?,
    )))
}

/// `DELETE /patients/:id` — removes every record hanging off the patient.
pub async fn delete(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    if !db::delete_patient(&conn, id)? {
        return Err(patient_not_found());
    }
    tracing::info!(patient_id = id, "Patient deleted");
    Ok(Json(MessageResponse::new("Patient deleted successfully")))
}

/// `PUT /patients/:id/administrative`
pub async fn update_administrative(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<AdministrativeFields>,
) -> Result<Json<EntityResponse<AdministrativeData>>, ApiError> {
    let mut errors = FieldErrors::new();
    let changes = administrative_changes(&mut errors, body);
    errors.finish()?;

    let conn = ctx.core.open_db()?;
    ensure_record_number_free(&conn, changes.record_number.as_deref(), Some(id))?;
    if !db::update_administrative_data(&conn, id, &changes)? {
        return Err(patient_not_found());
    }
    let data = db::get_administrative_data(&conn, id)?.ok_or_else(patient_not_found)?;
    Ok(Json(EntityResponse::new(
        "Administrative data updated successfully",
        "administrative_data",
        data,
    )))
}

/// `PUT /patients/:id/medical`
pub async fn update_medical(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<MedicalFields>,
) -> Result<Json<EntityResponse<MedicalData>>, ApiError> {
    let mut errors = FieldErrors::new();
    let changes = medical_changes(&mut errors, body);
    errors.finish()?;

    let conn = ctx.core.open_db()?;
    if !db::update_medical_data(&conn, id, &changes)? {
        return Err(patient_not_found());
    }
    let data = db::get_medical_data(&conn, id)?.ok_or_else(patient_not_found)?;
    Ok(Json(EntityResponse::new(
        "Medical data updated successfully",
        "medical_data",
        data,
    )))
}

/// `GET /patients/:id/consultations`
pub async fn consultations(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<Consultation>>, ApiError> {
    let conn = ctx.core.open_db()?;
    if !db::patient_exists(&conn, id)? {
        return Err(patient_not_found());
    }
    let consultations = db::list_patient_consultations(&conn, id)?;
    Ok(Json(query.apply(consultations)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub search: Option<String>,
}

/// `GET /patients/:id/consultations/export` — the (filtered) consultation
/// list as a PDF download.
pub async fn export_consultations(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    if !db::patient_exists(&conn, id)? {
        return Err(patient_not_found());
    }
    let consultations = filter(
        db::list_patient_consultations(&conn, id)?,
        query.search.as_deref(),
    );
    let bytes = patient_consultations_pdf(id, &consultations)?;
    tracing::info!(patient_id = id, rows = consultations.len(), "Consultations exported");
    Ok(attachment(
        &format!("patient-{id}-consultations.pdf"),
        "application/pdf",
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> PatientRequest {
        serde_json::from_value(value).unwrap()
    }

    fn complete() -> serde_json::Value {
        json!({
            "first_name": "Awa",
            "last_name": "Kone",
            "date_of_birth": "1980-06-15",
            "phone": "+229 97 00 00 00",
            "address": "Cotonou",
            "sex": "F",
            "registration_date": "2025-01-10",
            "referring_doctor": "Dr Adjovi",
            "last_treatment": "Furosemide"
        })
    }

    #[test]
    fn create_reports_every_missing_field() {
        let body = request(json!({"first_name": "Awa"}));
        let mut errors = FieldErrors::new();
        assert!(new_patient(&mut errors, body.patient).is_none());
        assert!(new_administrative(&mut errors, body.administrative).is_none());
        for field in ["last_name", "date_of_birth", "phone", "address", "sex",
            "registration_date", "referring_doctor"]
        {
            assert!(errors.contains(field), "missing error for {field}");
        }
        assert!(!errors.contains("first_name"));
    }

    #[test]
    fn create_defaults_stage_and_record_number() {
        let body = request(complete());
        let mut errors = FieldErrors::new();
        let administrative = new_administrative(&mut errors, body.administrative).unwrap();
        let medical = new_medical(&mut errors, body.medical).unwrap();
        assert!(errors.is_empty());
        assert_eq!(medical.mrc_stage, 1);
        assert_eq!(medical.current_treatments.as_deref(), Some("Furosemide"));
        assert!(Uuid::parse_str(&administrative.record_number).is_ok());
    }

    #[test]
    fn stage_outside_range_is_rejected() {
        for stage in [0, 6] {
            let body = request(json!({"mrc_stage": stage}));
            let mut errors = FieldErrors::new();
            medical_changes(&mut errors, body.medical);
            assert!(errors.contains("mrc_stage"));
        }
    }

    #[test]
    fn stage_accepts_legacy_field_name() {
        let mut value = complete();
        value["stage_mrc"] = json!(4);
        let body = request(value);
        let mut errors = FieldErrors::new();
        let medical = new_medical(&mut errors, body.medical).unwrap();
        assert!(errors.is_empty());
        assert_eq!(medical.mrc_stage, 4);

        let body = request(json!({"stage_mrc": 0}));
        let mut errors = FieldErrors::new();
        medical_changes(&mut errors, body.medical);
        assert!(errors.contains("mrc_stage"));
    }

    #[test]
    fn update_distinguishes_absent_from_null() {
        let body = request(json!({"phone": "0102", "email": null, "blood_group": "O+"}));
        let mut errors = FieldErrors::new();
        let changes = patient_changes(&mut errors, body.patient);
        let medical = medical_changes(&mut errors, body.medical);
        assert!(errors.is_empty());
        assert_eq!(changes.phone.as_deref(), Some("0102"));
        assert_eq!(changes.email, Some(None));
        assert!(changes.first_name.is_none());
        assert_eq!(medical.blood_group, Some(Some(BloodGroup::OPositive)));
        assert!(medical.medical_history.is_none());
    }

    #[test]
    fn update_rejects_blank_required_field_and_bad_email() {
        let body = request(json!({"last_name": "  ", "email": "not-an-email"}));
        let mut errors = FieldErrors::new();
        patient_changes(&mut errors, body.patient);
        assert!(errors.contains("last_name"));
        assert!(errors.contains("email"));
    }
}
