//! `POST /generate-report` — consultation report over a date range.

use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::check_reference;
use crate::api::error::ApiError;
use crate::api::extract::JsonBody;
use crate::api::types::ApiContext;
use crate::db;
use crate::models::enums::ReportFormat;
use crate::report::consultation_report;
use crate::validation::{parse_date, parse_enum, required_text, FieldErrors};

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub patient_id: Option<i64>,
    #[serde(rename = "type")]
    pub format: Option<String>,
}

/// Binary download response.
pub(crate) fn attachment(filename: &str, content_type: &'static str, bytes: Vec<u8>) -> Response {
    (
        [
            (CONTENT_TYPE, content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

pub async fn generate(
    State(ctx): State<ApiContext>,
    JsonBody(body): JsonBody<ReportRequest>,
) -> Result<Response, ApiError> {
    let mut errors = FieldErrors::new();
    let start = required_text(&mut errors, "start_date", body.start_date.as_deref())
        .and_then(|raw| parse_date(&mut errors, "start_date", &raw));
    let end = required_text(&mut errors, "end_date", body.end_date.as_deref())
        .and_then(|raw| parse_date(&mut errors, "end_date", &raw));
    let format = required_text(&mut errors, "type", body.format.as_deref())
        .and_then(|raw| parse_enum::<ReportFormat>(&mut errors, "type", &raw));
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            errors.add(
                "end_date",
                "The end date must be a date after or equal to start date.",
            );
        }
    }

    let conn = ctx.core.open_db()?;
    if let Some(id) = body.patient_id {
        check_reference(&mut errors, "patient_id", db::patient_exists(&conn, id)?);
    }
    errors.finish()?;
    let (Some(start), Some(end), Some(format)) = (start, end, format) else {
        return Err(ApiError::Internal("validated report fields missing".into()));
    };

    let consultations = db::consultations_between(&conn, start, end, body.patient_id)?;
    let report = consultation_report(&consultations, start, end, format)?;
    tracing::info!(
        %start,
        %end,
        patient_id = ?body.patient_id,
        rows = consultations.len(),
        format = %format,
        "Report generated"
    );
    Ok(attachment(&report.filename, report.content_type, report.bytes))
}
