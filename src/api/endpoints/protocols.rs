//! MRC stage care protocols and their assignment to patients.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use super::check_reference;
use crate::api::error::ApiError;
use crate::api::extract::{IdPath, JsonBody};
use crate::api::types::{ApiContext, AuthUser, EntityResponse, MessageResponse};
use crate::db;
use crate::listing::{ListQuery, Listing};
use crate::models::{MrcProtocol, NewProtocol, ProtocolAssignment, ProtocolChanges};
use crate::validation::{
    int_in_range, json_document, present_text, required, required_text, FieldErrors,
};

fn protocol_not_found() -> ApiError {
    ApiError::NotFound("Protocol not found".into())
}

#[derive(Debug, Default, Deserialize)]
pub struct ProtocolRequest {
    pub name: Option<String>,
    pub stage: Option<i64>,
    pub recommendations: Option<serde_json::Value>,
}

fn validate_stage(errors: &mut FieldErrors, stage: i64) -> Option<u8> {
    int_in_range(errors, "stage", stage, 1, 5).map(|s| s as u8)
}

fn new_protocol(body: ProtocolRequest) -> Result<NewProtocol, ApiError> {
    let mut errors = FieldErrors::new();
    let name = required_text(&mut errors, "name", body.name.as_deref());
    let stage = required(&mut errors, "stage", body.stage)
        .and_then(|s| validate_stage(&mut errors, s));
    let recommendations = required(&mut errors, "recommendations", body.recommendations)
        .and_then(|r| json_document(&mut errors, "recommendations", r));
    errors.finish()?;

    match (name, stage, recommendations) {
        (Some(name), Some(stage), Some(recommendations)) => Ok(NewProtocol {
            name,
            stage,
            recommendations,
        }),
        _ => Err(ApiError::Internal("validated protocol fields missing".into())),
    }
}

fn protocol_changes(body: ProtocolRequest) -> Result<ProtocolChanges, ApiError> {
    let mut errors = FieldErrors::new();
    let changes = ProtocolChanges {
        name: present_text(&mut errors, "name", body.name.as_deref()),
        stage: body.stage.and_then(|s| validate_stage(&mut errors, s)),
        recommendations: body
            .recommendations
            .and_then(|r| json_document(&mut errors, "recommendations", r)),
    };
    errors.finish()?;
    Ok(changes)
}

/// `GET /protocols` — ordered by stage.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<MrcProtocol>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(query.apply(db::list_protocols(&conn)?)?))
}

/// `POST /protocols`
pub async fn create(
    State(ctx): State<ApiContext>,
    JsonBody(body): JsonBody<ProtocolRequest>,
) -> Result<(StatusCode, Json<EntityResponse<MrcProtocol>>), ApiError> {
    let protocol = new_protocol(body)?;
    let conn = ctx.core.open_db()?;
    let id = db::insert_protocol(&conn, &protocol)?;
    tracing::info!(protocol_id = id, stage = protocol.stage, "Protocol created");

    let created = db::get_protocol(&conn, id)?.ok_or_else(protocol_not_found)?;
    Ok((
        StatusCode::CREATED,
        Json(EntityResponse::new("Protocol created successfully", "protocol", created)),
    ))
}

/// `GET /protocols/:id`
pub async fn show(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
) -> Result<Json<MrcProtocol>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(db::get_protocol(&conn, id)?.ok_or_else(protocol_not_found)?))
}

/// `PUT /protocols/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<ProtocolRequest>,
) -> Result<Json<EntityResponse<MrcProtocol>>, ApiError> {
    let changes = protocol_changes(body)?;
    let conn = ctx.core.open_db()?;
    if !db::update_protocol(&conn, id, &changes)? {
        return Err(protocol_not_found());
    }
    let updated = db::get_protocol(&conn, id)?.ok_or_else(protocol_not_found)?;
    Ok(Json(EntityResponse::new(
        "Protocol updated successfully",
        "protocol",
        updated,
    )))
}

/// `DELETE /protocols/:id` — also drops its patient assignments.
pub async fn delete(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    if !db::delete_protocol(&conn, id)? {
        return Err(protocol_not_found());
    }
    tracing::info!(protocol_id = id, "Protocol deleted");
    Ok(Json(MessageResponse::new("Protocol deleted successfully")))
}

/// `GET /patients/:id/protocols`
pub async fn list_for_patient(
    State(ctx): State<ApiContext>,
    IdPath(patient_id): IdPath,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<ProtocolAssignment>>, ApiError> {
    let conn = ctx.core.open_db()?;
    if !db::patient_exists(&conn, patient_id)? {
        return Err(ApiError::NotFound("Patient not found".into()));
    }
    let assignments = db::list_patient_protocols(&conn, patient_id)?;
    Ok(Json(query.apply(assignments)?))
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub protocol_id: Option<i64>,
}

/// `POST /patients/:id/protocols` — assigning twice only refreshes the
/// assignment.
pub async fn assign(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    IdPath(patient_id): IdPath,
    JsonBody(body): JsonBody<AssignRequest>,
) -> Result<Json<EntityResponse<Vec<ProtocolAssignment>>>, ApiError> {
    let mut errors = FieldErrors::new();
    let protocol_id = required(&mut errors, "protocol_id", body.protocol_id);

    let conn = ctx.core.open_db()?;
    if !db::patient_exists(&conn, patient_id)? {
        return Err(ApiError::NotFound("Patient not found".into()));
    }
    if let Some(id) = protocol_id {
        check_reference(&mut errors, "protocol_id", db::get_protocol(&conn, id)?.is_some());
    }
    errors.finish()?;
    let Some(protocol_id) = protocol_id else {
        return Err(ApiError::Internal("validated protocol id missing".into()));
    };

    db::assign_protocol(&conn, patient_id, protocol_id, Some(auth.id))?;
    tracing::info!(patient_id, protocol_id, assigned_by = auth.id, "Protocol assigned");
    Ok(Json(EntityResponse::new(
        "Protocol assigned successfully",
        "protocols",
        db::list_patient_protocols(&conn, patient_id)?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> ProtocolRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn create_requires_all_fields() {
        let Err(ApiError::Validation(errors)) = new_protocol(body(json!({}))) else {
            panic!("expected validation error");
        };
        for field in ["name", "stage", "recommendations"] {
            assert!(errors.contains(field));
        }
    }

    #[test]
    fn stage_must_be_between_one_and_five() {
        assert!(new_protocol(body(json!({
            "name": "Stage 6", "stage": 6, "recommendations": ["dialysis"]
        })))
        .is_err());
        let protocol = new_protocol(body(json!({
            "name": "Stage 3 follow-up",
            "stage": 3,
            "recommendations": "{\"diet\": \"low sodium\"}"
        })))
        .unwrap();
        assert_eq!(protocol.stage, 3);
        assert_eq!(protocol.recommendations["diet"], "low sodium");
    }

    #[test]
    fn update_checks_only_present_fields() {
        let changes = protocol_changes(body(json!({"stage": 2}))).unwrap();
        assert_eq!(changes.stage, Some(2));
        assert!(changes.name.is_none());
        assert!(protocol_changes(body(json!({"name": ""}))).is_err());
    }
}
