//! Appointment endpoints.
//!
//! - `GET /appointments`, `POST /appointments`
//! - `GET|PUT|DELETE /appointments/:id`
//! - `POST /appointments/:id/tasks` — attach (or re-assign) a task

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
use crate::models::enums::AppointmentStatus;
use crate::models::{Appointment, AppointmentChanges, NewAppointment};
use crate::validation::{
    nullable, nullable_text, optional_text, parse_datetime, parse_enum, present_text, required,
    required_text, FieldErrors,
};

fn appointment_not_found() -> ApiError {
    ApiError::NotFound("Appointment not found".into())
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentRequest {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub date: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    /// Task ids; on update the attached set is replaced.
    pub tasks: Option<Vec<i64>>,
}

/// Foreign keys named in the body must exist.
fn check_references(
    conn: &Connection,
    errors: &mut FieldErrors,
    patient_id: Option<i64>,
    doctor_id: Option<i64>,
    task_ids: Option<&[i64]>,
) -> Result<(), ApiError> {
    if let Some(id) = patient_id {
        check_reference(errors, "patient_id", db::patient_exists(conn, id)?);
    }
    if let Some(id) = doctor_id {
        check_reference(errors, "doctor_id", db::user_exists(conn, id)?);
    }
    if let Some(ids) = task_ids {
        let missing = db::missing_task_ids(conn, ids)?;
        if !missing.is_empty() {
            let listed: Vec<String> = missing.iter().map(i64::to_string).collect();
            errors.add("tasks", format!("Unknown task ids: {}.", listed.join(", ")));
        }
    }
    Ok(())
}

fn load_appointment(conn: &Connection, id: i64) -> Result<Appointment, ApiError> {
    db::get_appointment_with_relations(conn, id)?.ok_or_else(appointment_not_found)
}

/// `GET /appointments`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<Appointment>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(query.apply(db::list_appointments(&conn)?)?))
}

/// `POST /appointments` — always starts `scheduled`; listed tasks are
/// attached with the doctor as assigning user.
pub async fn create(
    State(ctx): State<ApiContext>,
    JsonBody(body): JsonBody<AppointmentRequest>,
) -> Result<(StatusCode, Json<EntityResponse<Appointment>>), ApiError> {
    let mut errors = FieldErrors::new();
    let patient_id = required(&mut errors, "patient_id", body.patient_id);
    let doctor_id = required(&mut errors, "doctor_id", body.doctor_id);
    let date = required_text(&mut errors, "date", body.date.as_deref())
        .and_then(|raw| parse_datetime(&mut errors, "date", &raw));
    let task_ids = body.tasks.unwrap_or_default();

    let conn = ctx.core.open_db()?;
    check_references(&conn, &mut errors, patient_id, doctor_id, Some(&task_ids))?;
    errors.finish()?;
    let (Some(patient_id), Some(doctor_id), Some(date)) = (patient_id, doctor_id, date) else {
        return Err(ApiError::Internal("validated appointment fields missing".into()));
    };

    let appointment = NewAppointment {
        patient_id,
        doctor_id,
        date,
        notes: optional_text(body.notes.flatten().as_deref()),
        task_ids,
    };
    let id = db::insert_appointment(&conn, &appointment)?;
    tracing::info!(appointment_id = id, patient_id, doctor_id, "Appointment created");

    Ok((
        StatusCode::CREATED,
        Json(EntityResponse::new(
            "Appointment created successfully",
            "appointment",
            load_appointment(&conn, id)?,
        )),
    ))
}

/// `GET /appointments/:id`
pub async fn show(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(load_appointment(&conn, id)?))
}

/// `PUT /appointments/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<AppointmentRequest>,
) -> Result<Json<EntityResponse<Appointment>>, ApiError> {
    let mut errors = FieldErrors::new();
    let changes = AppointmentChanges {
        patient_id: body.patient_id,
        doctor_id: body.doctor_id,
        date: present_text(&mut errors, "date", body.date.as_deref())
            .and_then(|raw| parse_datetime(&mut errors, "date", &raw)),
        status: present_text(&mut errors, "status", body.status.as_deref())
            .and_then(|raw| parse_enum::<AppointmentStatus>(&mut errors, "status", &raw)),
        notes: nullable_text(body.notes),
        task_ids: body.tasks,
    };

    let conn = ctx.core.open_db()?;
    if !db::appointment_exists(&conn, id)? {
        return Err(appointment_not_found());
    }
    check_references(
        &conn,
        &mut errors,
        changes.patient_id,
        changes.doctor_id,
        changes.task_ids.as_deref(),
    )?;
    errors.finish()?;

    db::update_appointment(&conn, id, &changes)?;
    tracing::info!(appointment_id = id, "Appointment updated");
    Ok(Json(EntityResponse::new(
        "Appointment updated successfully",
        "appointment",
        load_appointment(&conn, id)?,
    )))
}

/// `DELETE /appointments/:id` — detaches tasks; linked consultations keep
/// existing without the link.
pub async fn delete(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    if !db::delete_appointment(&conn, id)? {
        return Err(appointment_not_found());
    }
    tracing::info!(appointment_id = id, "Appointment deleted");
    Ok(Json(MessageResponse::new("Appointment deleted successfully")))
}

#[derive(Debug, Deserialize)]
pub struct AttachTaskRequest {
    pub task_id: Option<i64>,
    pub user_id: Option<i64>,
}

/// `POST /appointments/:id/tasks`
pub async fn attach_task(
    State(ctx): State<ApiContext>,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<AttachTaskRequest>,
) -> Result<Json<EntityResponse<Appointment>>, ApiError> {
    let mut errors = FieldErrors::new();
    let task_id = required(&mut errors, "task_id", body.task_id);
    let user_id = required(&mut errors, "user_id", body.user_id);

    let conn = ctx.core.open_db()?;
    if !db::appointment_exists(&conn, id)? {
        return Err(appointment_not_found());
    }
    if let Some(task_id) = task_id {
        check_reference(&mut errors, "task_id", db::get_task(&conn, task_id)?.is_some());
    }
    if let Some(user_id) = user_id {
        check_reference(&mut errors, "user_id", db::user_exists(&conn, user_id)?);
    }
    errors.finish()?;
    let (Some(task_id), Some(user_id)) = (task_id, user_id) else {
        return Err(ApiError::Internal("validated task fields missing".into()));
    };

    db::attach_task(&conn, id, task_id, user_id)?;
    tracing::info!(appointment_id = id, task_id, user_id, "Task attached");
    Ok(Json(EntityResponse::new(
        "Task attached successfully",
        "appointment",
        load_appointment(&conn, id)?,
    )))
}
