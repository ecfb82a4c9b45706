//! Consultation endpoints.
//!
//! - `GET /consultations`, `POST /consultations`
//! - `GET|PUT|DELETE /consultations/:id`
//! - `POST /consultations/from-appointment/:id`

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use rusqlite::Connection;
use serde::Deserialize;

use super::check_reference;
use crate::api::error::ApiError;
use crate::api::extract::{IdPath, JsonBody};
use crate::api::types::{ApiContext, EntityResponse, MessageResponse};
use crate::db;
use crate::listing::{ListQuery, Listing};
use crate::models::enums::ConsultationStatus;
use crate::models::{Consultation, ConsultationChanges, NewConsultation};
use crate::validation::{
    non_negative, nullable, optional_text, parse_datetime, parse_enum, parse_number,
    present_text, required, required_text, FieldErrors,
};

fn consultation_not_found() -> ApiError {
    ApiError::NotFound("Consultation not found".into())
}

#[derive(Debug, Default, Deserialize)]
pub struct ConsultationRequest {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub appointment_id: Option<Option<i64>>,
    pub consultation_date: Option<String>,
    pub doctor_remarks: Option<String>,
    pub cost: Option<serde_json::Value>,
    pub status: Option<String>,
}

fn validate_cost(errors: &mut FieldErrors, cost: &serde_json::Value) -> Option<f64> {
    parse_number(errors, "cost", cost).and_then(|c| non_negative(errors, "cost", c))
}

fn validate_status(errors: &mut FieldErrors, raw: Option<&str>) -> Option<ConsultationStatus> {
    optional_text(raw).and_then(|raw| parse_enum::<ConsultationStatus>(errors, "status", &raw))
}

fn check_references(
    conn: &Connection,
    errors: &mut FieldErrors,
    patient_id: Option<i64>,
    doctor_id: Option<i64>,
    appointment_id: Option<i64>,
) -> Result<(), ApiError> {
    if let Some(id) = patient_id {
        check_reference(errors, "patient_id", db::patient_exists(conn, id)?);
    }
    if let Some(id) = doctor_id {
        check_reference(errors, "doctor_id", db::user_exists(conn, id)?);
    }
    if let Some(id) = appointment_id {
        check_reference(errors, "appointment_id", db::appointment_exists(conn, id)?);
    }
    Ok(())
}

fn load_consultation(conn: &Connection, id: i64) -> Result<Consultation, ApiError> {
    db::get_consultation_with_relations(conn, id)?.ok_or_else(consultation_not_found)
}

/// `GET /consultations` — newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<Consultation>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(query.apply(db::list_consultations(&conn)?)?))
}

/// `POST /consultations` — a linked appointment is marked completed.
pub async fn create(
    State(ctx): State<ApiContext>,
    JsonBody(body): JsonBody<ConsultationRequest>,
) -> Result<(StatusCode, Json<EntityResponse<Consultation>>), ApiError> {
    let mut errors = FieldErrors::new();
    let patient_id = required(&mut errors, "patient_id", body.patient_id);
    let doctor_id = required(&mut errors, "doctor_id", body.doctor_id);
    let appointment_id = body.appointment_id.flatten();
    let consultation_date =
        required_text(&mut errors, "consultation_date", body.consultation_date.as_deref())
            .and_then(|raw| parse_datetime(&mut errors, "consultation_date", &raw));
    let doctor_remarks =
        required_text(&mut errors, "doctor_remarks", body.doctor_remarks.as_deref());
    let cost = required(&mut errors, "cost", body.cost.filter(|c| !c.is_null()))
        .and_then(|c| validate_cost(&mut errors, &c));
    let status = validate_status(&mut errors, body.status.as_deref());

    let conn = ctx.core.open_db()?;
    check_references(&conn, &mut errors, patient_id, doctor_id, appointment_id)?;
    errors.finish()?;
    let (Some(patient_id), Some(doctor_id), Some(consultation_date), Some(doctor_remarks), Some(cost)) =
        (patient_id, doctor_id, consultation_date, doctor_remarks, cost)
    else {
        return Err(ApiError::Internal("validated consultation fields missing".into()));
    };

    let consultation = NewConsultation {
        patient_id,
        doctor_id,
        appointment_id,
        consultation_date,
        doctor_remarks,
        cost,
        status: status.unwrap_or(ConsultationStatus::Pending),
    };
    let id = db::insert_consultation(&conn, &consultation)?;
    tracing::info!(consultation_id = id, patient_id, ?appointment_id, "Consultation created");

    Ok((
        StatusCode::CREATED,
        Json(EntityResponse::new(
            "Consultation created successfully",
            "consultation",
            load_consultation(&conn, id)?,
        )),
    ))
}

/// `GET /consultations/:id`
pub async fn show(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
) -> Result<Json<Consultation>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(load_consultation(&conn, id)?))
}

/// `PUT /consultations/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<ConsultationRequest>,
) -> Result<Json<EntityResponse<Consultation>>, ApiError> {
    let mut errors = FieldErrors::new();
    let changes = ConsultationChanges {
        patient_id: body.patient_id,
        doctor_id: body.doctor_id,
        appointment_id: body.appointment_id,
        consultation_date: present_text(
            &mut errors,
            "consultation_date",
            body.consultation_date.as_deref(),
        )
        .and_then(|raw| parse_datetime(&mut errors, "consultation_date", &raw)),
        doctor_remarks: present_text(&mut errors, "doctor_remarks", body.doctor_remarks.as_deref()),
        cost: body
            .cost
            .as_ref()
            .and_then(|c| validate_cost(&mut errors, c)),
        status: validate_status(&mut errors, body.status.as_deref()),
    };

    let conn = ctx.core.open_db()?;
    if db::get_consultation(&conn, id)?.is_none() {
        return Err(consultation_not_found());
    }
    check_references(
        &conn,
        &mut errors,
        changes.patient_id,
        changes.doctor_id,
        changes.appointment_id.flatten(),
    )?;
    errors.finish()?;

    db::update_consultation(&conn, id, &changes)?;
    tracing::info!(consultation_id = id, "Consultation updated");
    Ok(Json(EntityResponse::new(
        "Consultation updated successfully",
        "consultation",
        load_consultation(&conn, id)?,
    )))
}

/// `DELETE /consultations/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    if !db::delete_consultation(&conn, id)? {
        return Err(consultation_not_found());
    }
    tracing::info!(consultation_id = id, "Consultation deleted");
    Ok(Json(MessageResponse::new("Consultation deleted successfully")))
}

#[derive(Debug, Deserialize)]
pub struct FromAppointmentRequest {
    pub doctor_remarks: Option<String>,
    pub cost: Option<serde_json::Value>,
}

/// `POST /consultations/from-appointment/:id` — patient and doctor come
/// from the appointment, which is marked completed.
pub async fn from_appointment(
    State(ctx): State<ApiContext>,
    IdPath(appointment_id): IdPath,
    JsonBody(body): JsonBody<FromAppointmentRequest>,
) -> Result<(StatusCode, Json<EntityResponse<Consultation>>), ApiError> {
    let mut errors = FieldErrors::new();
    let doctor_remarks =
        required_text(&mut errors, "doctor_remarks", body.doctor_remarks.as_deref());
    let cost = required(&mut errors, "cost", body.cost.filter(|c| !c.is_null()))
        .and_then(|c| validate_cost(&mut errors, &c));
    errors.finish()?;
    let (Some(doctor_remarks), Some(cost)) = (doctor_remarks, cost) else {
        return Err(ApiError::Internal("validated consultation fields missing".into()));
    };

    let conn = ctx.core.open_db()?;
    let id = db::create_from_appointment(&conn, appointment_id, &doctor_remarks, cost)?
        .ok_or_else(|| ApiError::NotFound("Appointment not found".into()))?;
    tracing::info!(consultation_id = id, appointment_id, "Consultation created from appointment");

    Ok((
        StatusCode::CREATED,
        Json(EntityResponse::new(
            "Consultation created from appointment",
            "consultation",
            load_consultation(&conn, id)?,
        )),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn negative_cost_is_rejected() {
        let mut errors = FieldErrors::new();
        assert_eq!(validate_cost(&mut errors, &json!(-5)), None);
        assert!(errors.contains("cost"));
    }

    #[test]
    fn string_cost_is_accepted() {
        let mut errors = FieldErrors::new();
        assert_eq!(validate_cost(&mut errors, &json!("15000")), Some(15000.0));
        assert!(errors.is_empty());
    }

    #[test]
    fn status_is_optional_but_checked() {
        let mut errors = FieldErrors::new();
        assert_eq!(validate_status(&mut errors, None), None);
        assert_eq!(
            validate_status(&mut errors, Some("billed")),
            Some(ConsultationStatus::Billed)
        );
        assert!(errors.is_empty());
        assert_eq!(validate_status(&mut errors, Some("paid")), None);
        assert!(errors.contains("status"));
    }

    #[test]
    fn appointment_link_can_be_cleared() {
        let body: ConsultationRequest =
            serde_json::from_value(json!({"appointment_id": null})).unwrap();
        assert_eq!(body.appointment_id, Some(None));
        let body: ConsultationRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(body.appointment_id, None);
    }
}
