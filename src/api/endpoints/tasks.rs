//! Catalogue of appointment tasks (lab work, imaging, ...).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::extract::JsonBody;
use crate::api::types::{ApiContext, EntityResponse};
use crate::db;
use crate::listing::{ListQuery, Listing};
use crate::models::enums::TaskStatus;
use crate::models::{AppointmentTask, NewTask};
use crate::validation::{optional_text, parse_enum, required_text, FieldErrors};

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

fn validate(body: TaskRequest) -> Result<NewTask, ApiError> {
    let mut errors = FieldErrors::new();
    let task_type = required_text(&mut errors, "type", body.task_type.as_deref());
    let status = match optional_text(body.status.as_deref()) {
        None => Some(TaskStatus::Pending),
        Some(raw) => parse_enum::<TaskStatus>(&mut errors, "status", &raw),
    };
    errors.finish()?;
    match (task_type, status) {
        (Some(task_type), Some(status)) => Ok(NewTask {
            task_type,
            description: optional_text(body.description.as_deref()),
            status,
        }),
        _ => Err(ApiError::Internal("validated task fields missing".into())),
    }
}

/// `GET /appointment-tasks`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<AppointmentTask>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(query.apply(db::list_tasks(&conn)?)?))
}

/// `POST /appointment-tasks`
pub async fn create(
    State(ctx): State<ApiContext>,
    JsonBody(body): JsonBody<TaskRequest>,
) -> Result<(StatusCode, Json<EntityResponse<AppointmentTask>>), ApiError> {
    let task = validate(body)?;
    let conn = ctx.core.open_db()?;
    let id = db::insert_task(&conn, &task)?;
    let created = db::get_task(&conn, id)?
        .ok_or_else(|| ApiError::Internal(format!("task {id} vanished after insert")))?;
    tracing::info!(task_id = id, "Appointment task created");
    Ok((
        StatusCode::CREATED,
        Json(EntityResponse::new("Task created successfully", "task", created)),
    ))
}
