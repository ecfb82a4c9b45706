//! REST endpoint handlers, one module per dashboard resource.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod consultations;
pub mod dialysis;
pub mod health;
pub mod patients;
pub mod protocols;
pub mod reports;
pub mod tasks;

use crate::validation::FieldErrors;

/// Field error for an id that points at no row.
pub(crate) fn check_reference(errors: &mut FieldErrors, field: &str, found: bool) {
    if !found {
        errors.add(
            field,
            format!("The selected {} is invalid.", field.replace('_', " ")),
        );
    }
}
