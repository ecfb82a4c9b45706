//! Bearer token authentication and role gate.
//!
//! Extracts `Authorization: Bearer <token>`, looks up its SHA-256 in the
//! token table, and injects `AuthUser` into request extensions for
//! downstream handlers.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthUser};
use crate::crypto::hash_token;
use crate::db;
use crate::models::enums::TokenKind;

/// Require a valid, unexpired access token.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = bearer_token(&req).ok_or(ApiError::Unauthorized)?;
    let token_hash = hash_token(token);

    // Connection dropped before any .await
    let user = {
        let conn = ctx.core.open_db()?;
        let stored = db::find_token(&conn, &token_hash, TokenKind::Access)?
            .ok_or(ApiError::Unauthorized)?;
        if stored.is_expired(db::timestamp()) {
            db::delete_token(&conn, &token_hash)?;
            return Err(ApiError::TokenExpired);
        }
        db::get_user(&conn, stored.user_id)?.ok_or(ApiError::Unauthorized)?
    };

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        email: user.email,
        role: user.role,
        token_hash,
    });

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));
    Ok(response)
}

/// Reject authenticated users whose role is not admin. Must run inside
/// `require_auth`.
pub async fn require_admin(req: Request<axum::body::Body>, next: Next) -> Response {
    let is_admin = req
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.role.is_admin());
    match is_admin {
        Some(true) => next.run(req).await,
        Some(false) => ApiError::Forbidden.into_response(),
        None => ApiError::Unauthorized.into_response(),
    }
}

fn bearer_token<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
