//! Shared types for the REST layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::core_state::CoreState;
use crate::models::enums::Role;

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Authenticated account, injected into request extensions by the auth
/// middleware after successful token validation.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
    /// Hash of the bearer token that authenticated this request.
    pub token_hash: [u8; 32],
}

/// `{"message": ...}` body for deletes and actions without a payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{"message": ..., "<key>": entity}` body returned by create and update.
#[derive(Debug, Serialize)]
pub struct EntityResponse<T> {
    pub message: String,
    #[serde(flatten)]
    entity: BTreeMap<&'static str, T>,
}

impl<T> EntityResponse<T> {
    pub fn new(message: impl Into<String>, key: &'static str, entity: T) -> Self {
        Self {
            message: message.into(),
            entity: BTreeMap::from([(key, entity)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_response_nests_under_key() {
        let body = EntityResponse::new("Patient created successfully", "patient", 42);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "Patient created successfully");
        assert_eq!(json["patient"], 42);
    }
}
