//! Dialysis sessions of a patient.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::extract::{IdPath, JsonBody};
use crate::api::types::{ApiContext, EntityResponse, MessageResponse};
use crate::db;
use crate::listing::{ListQuery, Listing};
use crate::models::enums::DialysisType;
use crate::models::{DialysisStep, DialysisStepChanges, NewDialysisStep};
use crate::validation::{
    json_document, nullable, nullable_text, parse_datetime, parse_enum, positive_int,
    present_text, required, required_text, FieldErrors,
};

fn step_not_found() -> ApiError {
    ApiError::NotFound("Dialysis step not found".into())
}

#[derive(Debug, Default, Deserialize)]
pub struct DialysisStepRequest {
    #[serde(rename = "type")]
    pub step_type: Option<String>,
    pub start_time: Option<String>,
    pub duration_minutes: Option<i64>,
    pub parameters: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

/// Session measurements must form a JSON object.
fn validate_parameters(
    errors: &mut FieldErrors,
    parameters: serde_json::Value,
) -> Option<serde_json::Value> {
    let document = json_document(errors, "parameters", parameters)?;
    if document.is_object() {
        Some(document)
    } else {
        errors.add("parameters", "The parameters field must be a JSON object.");
        None
    }
}

fn new_step(body: DialysisStepRequest) -> Result<NewDialysisStep, ApiError> {
    let mut errors = FieldErrors::new();
    let step_type = required_text(&mut errors, "type", body.step_type.as_deref())
        .and_then(|raw| parse_enum::<DialysisType>(&mut errors, "type", &raw));
    let start_time = required_text(&mut errors, "start_time", body.start_time.as_deref())
        .and_then(|raw| parse_datetime(&mut errors, "start_time", &raw));
    let duration_minutes = required(&mut errors, "duration_minutes", body.duration_minutes)
        .and_then(|d| positive_int(&mut errors, "duration_minutes", d));
    let parameters = required(&mut errors, "parameters", body.parameters)
        .and_then(|p| validate_parameters(&mut errors, p));
    errors.finish()?;

    match (step_type, start_time, duration_minutes, parameters) {
        (Some(step_type), Some(start_time), Some(duration_minutes), Some(parameters)) => {
            Ok(NewDialysisStep {
                step_type,
                start_time,
                duration_minutes,
                parameters,
                notes: nullable_text(body.notes).flatten(),
            })
        }
        _ => Err(ApiError::Internal("validated dialysis fields missing".into())),
    }
}

fn step_changes(body: DialysisStepRequest) -> Result<DialysisStepChanges, ApiError> {
    let mut errors = FieldErrors::new();
    let changes = DialysisStepChanges {
        step_type: present_text(&mut errors, "type", body.step_type.as_deref())
            .and_then(|raw| parse_enum::<DialysisType>(&mut errors, "type", &raw)),
        start_time: present_text(&mut errors, "start_time", body.start_time.as_deref())
            .and_then(|raw| parse_datetime(&mut errors, "start_time", &raw)),
        duration_minutes: body
            .duration_minutes
            .and_then(|d| positive_int(&mut errors, "duration_minutes", d)),
        parameters: body
            .parameters
            .and_then(|p| validate_parameters(&mut errors, p)),
        notes: nullable_text(body.notes),
    };
    errors.finish()?;
    Ok(changes)
}

/// `GET /patients/:id/dialysis-steps`
pub async fn list_for_patient(
    State(ctx): State<ApiContext>,
    IdPath(patient_id): IdPath,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<DialysisStep>>, ApiError> {
    let conn = ctx.core.open_db()?;
    if !db::patient_exists(&conn, patient_id)? {
        return Err(ApiError::NotFound("Patient not found".into()));
    }
    let steps = db::list_patient_dialysis_steps(&conn, patient_id)?;
    Ok(Json(query.apply(steps)?))
}

/// `POST /patients/:id/dialysis-steps`
pub async fn create(
    State(ctx): State<ApiContext>,
    IdPath(patient_id): IdPath,
    JsonBody(body): JsonBody<DialysisStepRequest>,
) -> Result<(StatusCode, Json<EntityResponse<DialysisStep>>), ApiError> {
    let step = new_step(body)?;
    let conn = ctx.core.open_db()?;
    if !db::patient_exists(&conn, patient_id)? {
        return Err(ApiError::NotFound("Patient not found".into()));
    }
    let id = db::insert_dialysis_step(&conn, patient_id, &step)?;
    tracing::info!(step_id = id, patient_id, kind = %step.step_type, "Dialysis step recorded");

    let created = db::get_dialysis_step(&conn, id)?.ok_or_else(step_not_found)?;
    Ok((
        StatusCode::CREATED,
        Json(EntityResponse::new(
            "Dialysis step created successfully",
            "dialysis_step",
            created,
        )),
    ))
}

/// `GET /dialysis-steps/:id`
pub async fn show(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
) -> Result<Json<DialysisStep>, ApiError> {
    let conn = ctx.core.open_db()?;
    let step = db::get_dialysis_step(&conn, id)?.ok_or_else(step_not_found)?;
    Ok(Json(step))
}

/// `PUT /dialysis-steps/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<DialysisStepRequest>,
) -> Result<Json<EntityResponse<DialysisStep>>, ApiError> {
    let changes = step_changes(body)?;
    let conn = ctx.core.open_db()?;
    if !db::update_dialysis_step(&conn, id, &changes)? {
        return Err(step_not_found());
    }
    let updated = db::get_dialysis_step(&conn, id)?.ok_or_else(step_not_found)?;
    Ok(Json(EntityResponse::new(
        "Dialysis step updated successfully",
        "dialysis_step",
        updated,
    )))
}

/// `DELETE /dialysis-steps/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    if !db::delete_dialysis_step(&conn, id)? {
        return Err(step_not_found());
    }
    Ok(Json(MessageResponse::new("Dialysis step deleted successfully")))
}
