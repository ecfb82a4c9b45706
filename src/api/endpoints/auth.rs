//! Authentication and password reset endpoints.
//!
//! - `POST /login` — credentials → access token + refresh cookie
//! - `POST /refresh-token` — refresh cookie → new access token
//! - `POST /logout` — revoke the session, clear the cookie
//! - `GET /user` — the authenticated account
//! - `GET /reset-password/:email` — does the account exist
//! - `POST /send-temp-password` — mail a fresh temporary password
//! - `POST /reset-password` — temporary password → new password

use axum::extract::{Path, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::extract::JsonBody;
use crate::api::types::{ApiContext, AuthUser, MessageResponse};
use crate::crypto::{generate_temporary_password, generate_token, hash_token, verify_password};
use crate::db;
use crate::mailer::OutgoingMail;
use crate::models::enums::{Role, TokenKind};
use crate::models::User;
use crate::validation::{
    check_confirmation, check_password_length, required, required_email, required_text,
    FieldErrors,
};

pub const REFRESH_COOKIE: &str = "refresh_token";

const INVALID_LOGIN: &str = "Invalid email or password";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub message: &'static str,
    pub access_token: String,
    pub role: Role,
    pub home_path: &'static str,
}

/// `POST /login`
pub async fn login(
    State(ctx): State<ApiContext>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    let mut errors = FieldErrors::new();
    let email = required_text(&mut errors, "email", body.email.as_deref());
    let password = required(&mut errors, "password", body.password.filter(|p| !p.is_empty()));
    errors.finish()?;
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::InvalidCredentials(INVALID_LOGIN.into()));
    };

    let conn = ctx.core.open_db()?;
    let Some(creds) = db::find_credentials_by_email(&conn, &email)? else {
        tracing::info!("Login rejected: unknown email");
        return Err(ApiError::InvalidCredentials(INVALID_LOGIN.into()));
    };
    if !verify_password(&password, &creds.password_hash)? {
        tracing::info!(user_id = creds.user.id, "Login rejected: wrong password");
        return Err(ApiError::InvalidCredentials(INVALID_LOGIN.into()));
    }

    let access_token = issue_token(&ctx, &conn, creds.user.id, TokenKind::Access)?;
    let refresh_token = issue_token(&ctx, &conn, creds.user.id, TokenKind::Refresh)?;
    tracing::info!(user_id = creds.user.id, role = %creds.user.role, "Login succeeded");

    let cookie = refresh_cookie(&refresh_token, ctx.core.config.refresh_token_ttl_days * 86_400);
    let body = TokenResponse {
        message: "Login successful",
        access_token,
        role: creds.user.role,
        home_path: creds.user.role.home_path(),
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// `POST /refresh-token`
pub async fn refresh(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let invalid = || ApiError::InvalidCredentials("Refresh token missing or invalid".into());
    let token = cookie_value(&headers, REFRESH_COOKIE).ok_or_else(invalid)?;
    let token_hash = hash_token(token);

    let conn = ctx.core.open_db()?;
    let stored = db::find_token(&conn, &token_hash, TokenKind::Refresh)?.ok_or_else(invalid)?;
    if stored.is_expired(db::timestamp()) {
        db::delete_token(&conn, &token_hash)?;
        return Err(invalid());
    }
    let user = db::get_user(&conn, stored.user_id)?.ok_or_else(invalid)?;

    let access_token = issue_token(&ctx, &conn, user.id, TokenKind::Access)?;
    Ok(Json(TokenResponse {
        message: "Token refreshed",
        access_token,
        role: user.role,
        home_path: user.role.home_path(),
    }))
}

/// `POST /logout` — revokes whichever of the bearer token and refresh
/// cookie were presented. Always succeeds.
pub async fn logout(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    if let Some(token) = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        db::delete_token(&conn, &hash_token(token.trim()))?;
    }
    if let Some(token) = cookie_value(&headers, REFRESH_COOKIE) {
        db::delete_token(&conn, &hash_token(token))?;
    }

    let cleared = refresh_cookie("", 0);
    Ok((
        [(SET_COOKIE, cleared)],
        Json(MessageResponse::new("Logged out successfully")),
    )
        .into_response())
}

/// `GET /user`
pub async fn current_user(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<User>, ApiError> {
    let conn = ctx.core.open_db()?;
    let user = db::get_user(&conn, auth.id)?.ok_or(ApiError::Unauthorized)?;
    Ok(Json(user))
}

#[derive(Serialize)]
pub struct EmailResponse {
    pub email: String,
}

/// `GET /reset-password/:email`
pub async fn reset_lookup(
    State(ctx): State<ApiContext>,
    Path(email): Path<String>,
) -> Result<Json<EmailResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let creds = db::find_credentials_by_email(&conn, &email)?
        .ok_or_else(|| ApiError::NotFound("No account uses this email".into()))?;
    Ok(Json(EmailResponse {
        email: creds.user.email,
    }))
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

/// `POST /send-temp-password`
pub async fn send_temp_password(
    State(ctx): State<ApiContext>,
    JsonBody(body): JsonBody<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    let email = required_email(&mut errors, "email", body.email.as_deref());
    errors.finish()?;
    let email = email.ok_or(ApiError::Internal("validated email missing".into()))?;

    let conn = ctx.core.open_db()?;
    let creds = db::find_credentials_by_email(&conn, &email)?
        .ok_or_else(|| ApiError::NotFound("No account uses this email".into()))?;

    let temporary = generate_temporary_password();
    let hash = ctx.core.hash_password(&temporary)?;
    db::update_password_hash(&conn, creds.user.id, &hash)?;
    ctx.core
        .mailer()
        .send(&OutgoingMail::temporary_password(&creds.user.email, &temporary))?;
    tracing::info!(user_id = creds.user.id, "Temporary password issued");

    Ok(Json(MessageResponse::new(
        "A temporary password has been sent to your email address",
    )))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub temporary_password: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

/// `POST /reset-password`
pub async fn reset_password(
    State(ctx): State<ApiContext>,
    JsonBody(body): JsonBody<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    let email = required_email(&mut errors, "email", body.email.as_deref());
    let temporary = required(
        &mut errors,
        "temporary_password",
        body.temporary_password.clone().filter(|p| !p.is_empty()),
    );
    let password = body.password.clone().unwrap_or_default();
    if required_text(&mut errors, "password", body.password.as_deref()).is_some() {
        check_password_length(&mut errors, "password", &password);
        check_confirmation(&mut errors, "password", &password, body.password_confirmation.as_deref());
    }
    errors.finish()?;
    let (Some(email), Some(temporary)) = (email, temporary) else {
        return Err(ApiError::Internal("validated fields missing".into()));
    };

    let conn = ctx.core.open_db()?;
    let creds = db::find_credentials_by_email(&conn, &email)?
        .ok_or_else(|| ApiError::NotFound("No account uses this email".into()))?;
    if !verify_password(&temporary, &creds.password_hash)? {
        return Err(ApiError::InvalidCredentials(
            "The temporary password is incorrect".into(),
        ));
    }

    let hash = ctx.core.hash_password(&password)?;
    db::update_password_hash(&conn, creds.user.id, &hash)?;
    let revoked = db::delete_user_tokens(&conn, creds.user.id)?;
    tracing::info!(user_id = creds.user.id, revoked, "Password reset");

    Ok(Json(MessageResponse::new("Password reset successfully")))
}

/// Create and store a token, returning the plaintext.
pub(crate) fn issue_token(
    ctx: &ApiContext,
    conn: &Connection,
    user_id: i64,
    kind: TokenKind,
) -> Result<String, ApiError> {
    let now = db::timestamp();
    let expires_at = match kind {
        TokenKind::Access => ctx.core.access_token_expiry(now),
        TokenKind::Refresh => ctx.core.refresh_token_expiry(now),
    };
    let token = generate_token();
    db::insert_token(conn, user_id, &hash_token(&token), kind, expires_at)?;
    Ok(token)
}

fn refresh_cookie(value: &str, max_age_secs: i64) -> String {
    format!("{REFRESH_COOKIE}={value}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}")
}

/// Value of cookie `name` across all `Cookie` headers.
pub(crate) fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; refresh_token=abc123"));
        assert_eq!(cookie_value(&headers, REFRESH_COOKIE), Some("abc123"));
        assert_eq!(cookie_value(&headers, "session"), None);
    }

    #[test]
    fn empty_cookie_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("refresh_token="));
        assert_eq!(cookie_value(&headers, REFRESH_COOKIE), None);
    }

    #[test]
    fn refresh_cookie_is_http_only() {
        let cookie = refresh_cookie("tok", 60);
        assert!(cookie.starts_with("refresh_token=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("Max-Age=60"));
    }
}
