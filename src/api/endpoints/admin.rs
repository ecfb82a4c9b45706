//! Admin-only endpoints: doctor accounts, dashboard counters and the
//! admin's own credentials.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::extract::JsonBody;
use crate::api::types::{ApiContext, AuthUser, EntityResponse, MessageResponse};
use crate::crypto::{generate_temporary_password, verify_password};
use crate::db;
use crate::listing::{ListQuery, Listing};
use crate::mailer::OutgoingMail;
use crate::models::enums::Role;
use crate::models::{DashboardStats, NewUser, User};
use crate::validation::{
    check_confirmation, check_password_strength, optional_text, required, required_email,
    required_text, FieldErrors,
};

/// `GET /doctors`
pub async fn list_doctors(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<User>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctors = db::list_users_by_role(&conn, Role::User)?;
    Ok(Json(query.apply(doctors)?))
}

#[derive(Debug, Deserialize)]
pub struct DoctorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
}

/// `POST /doctors` — the account gets a generated temporary password,
/// delivered by mail.
pub async fn create_doctor(
    State(ctx): State<ApiContext>,
    JsonBody(body): JsonBody<DoctorRequest>,
) -> Result<(StatusCode, Json<EntityResponse<User>>), ApiError> {
    let mut errors = FieldErrors::new();
    let first_name = required_text(&mut errors, "first_name", body.first_name.as_deref());
    let last_name = required_text(&mut errors, "last_name", body.last_name.as_deref());
    let email = required_email(&mut errors, "email", body.email.as_deref());
    errors.finish()?;
    let (Some(first_name), Some(last_name), Some(email)) = (first_name, last_name, email) else {
        return Err(ApiError::Internal("validated doctor fields missing".into()));
    };

    let conn = ctx.core.open_db()?;
    if db::email_taken(&conn, &email, None)? {
        return Err(ApiError::Conflict("This email is already in use".into()));
    }

    let temporary = generate_temporary_password();
    let doctor = NewUser {
        first_name,
        last_name,
        email,
        contact: optional_text(body.contact.as_deref()),
        role: Role::User,
        password_hash: ctx.core.hash_password(&temporary)?,
    };
    // The account only exists once its temporary password was delivered.
    let tx = conn.unchecked_transaction()?;
    let id = db::insert_user(&tx, &doctor)?;
    let created = db::get_user(&tx, id)?
        .ok_or_else(|| ApiError::Internal(format!("user {id} vanished after insert")))?;
    ctx.core.mailer().send(&OutgoingMail::account_created(
        &created.email,
        &created.full_name(),
        &temporary,
    ))?;
    tx.commit()?;
    tracing::info!(user_id = id, "Doctor account created");

    Ok((
        StatusCode::CREATED,
        Json(EntityResponse::new(
            "Doctor created successfully. A temporary password has been sent by email.",
            "doctor",
            created,
        )),
    ))
}

/// `GET /stat`
pub async fn stats(State(ctx): State<ApiContext>) -> Result<Json<DashboardStats>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(db::dashboard_stats(&conn)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub email: Option<String>,
    /// Current password, re-checked before the email changes.
    pub password: Option<String>,
}

/// `PUT /user` — change the signed-in admin's email.
pub async fn update_account(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(body): JsonBody<UpdateAccountRequest>,
) -> Result<Json<EntityResponse<User>>, ApiError> {
    let mut errors = FieldErrors::new();
    let email = required_email(&mut errors, "email", body.email.as_deref());
    let password = required(&mut errors, "password", body.password.filter(|p| !p.is_empty()));

    let conn = ctx.core.open_db()?;
    let creds = db::get_credentials(&conn, auth.id)?.ok_or(ApiError::Unauthorized)?;
    if let Some(password) = &password {
        if !verify_password(password, &creds.password_hash)? {
            errors.add("password", "The password is incorrect.");
        }
    }
    if let Some(email) = &email {
        if db::email_taken(&conn, email, Some(auth.id))? {
            errors.add("email", "The email has already been taken.");
        }
    }
    errors.finish()?;
    let Some(email) = email else {
        return Err(ApiError::Internal("validated email missing".into()));
    };

    db::update_email(&conn, auth.id, &email)?;
    tracing::info!(user_id = auth.id, "Account email updated");
    let user = db::get_user(&conn, auth.id)?.ok_or(ApiError::Unauthorized)?;
    Ok(Json(EntityResponse::new("Email updated successfully", "user", user)))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

/// `PUT /user/password`
pub async fn update_password(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(body): JsonBody<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    let current = required(
        &mut errors,
        "current_password",
        body.current_password.clone().filter(|p| !p.is_empty()),
    );
    let password = body.password.clone().unwrap_or_default();
    if required_text(&mut errors, "password", body.password.as_deref()).is_some() {
        check_password_strength(&mut errors, "password", &password);
        check_confirmation(
            &mut errors,
            "password",
            &password,
            body.password_confirmation.as_deref(),
        );
    }

    let conn = ctx.core.open_db()?;
    let creds = db::get_credentials(&conn, auth.id)?.ok_or(ApiError::Unauthorized)?;
    if let Some(current) = &current {
        if !verify_password(current, &creds.password_hash)? {
            errors.add("current_password", "The current password is incorrect.");
        }
    }
    if !password.is_empty() && verify_password(&password, &creds.password_hash)? {
        errors.add(
            "password",
            "The new password must be different from the current password.",
        );
    }
    errors.finish()?;

    let hash = ctx.core.hash_password(&password)?;
    db::update_password_hash(&conn, auth.id, &hash)?;
    tracing::info!(user_id = auth.id, "Account password updated");
    Ok(Json(MessageResponse::new("Your password has been updated successfully.")))
}
