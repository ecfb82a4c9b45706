//! Request validation helpers.
//!
//! Handlers collect every problem into a [`FieldErrors`] map before
//! touching the database, so one response reports all invalid fields.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::enums::StrEnum;

pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Field name → list of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn finish(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Deserialize a field that distinguishes "absent" (`None`) from an
/// explicit `null` (`Some(None)`). Use with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

/// Trimmed non-empty text, or a "required" error.
pub fn required_text(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            errors.add(field, format!("The {} field is required.", label(field)));
            None
        }
    }
}

/// Trimmed text; blank becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// For partial updates: an absent field is left alone, a present one must
/// not be blank.
pub fn present_text(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<String> {
    value.and_then(|v| required_text(errors, field, Some(v)))
}

/// For nullable fields in partial updates: blank clears like `null`.
pub fn nullable_text(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(|inner| optional_text(inner.as_deref()))
}

pub fn required<T>(errors: &mut FieldErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(field, format!("The {} field is required.", label(field)));
    }
    value
}

pub fn parse_date(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(
                field,
                format!("The {} field must be a valid date (YYYY-MM-DD).", label(field)),
            );
            None
        }
    }
}

/// Accepts `YYYY-MM-DD HH:MM[:SS]`, the `T`-separated variants, or a bare
/// date (midnight).
pub fn parse_datetime(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let parsed = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        });
    if parsed.is_none() {
        errors.add(field, format!("The {} field must be a valid date.", label(field)));
    }
    parsed
}

pub fn parse_enum<T: StrEnum>(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(
                field,
                format!(
                    "The selected {} is invalid. Allowed: {}.",
                    label(field),
                    T::allowed().join(", ")
                ),
            );
            None
        }
    }
}

pub fn int_in_range(
    errors: &mut FieldErrors,
    field: &str,
    value: i64,
    min: i64,
    max: i64,
) -> Option<i64> {
    if (min..=max).contains(&value) {
        Some(value)
    } else {
        errors.add(
            field,
            format!("The {} field must be between {min} and {max}.", label(field)),
        );
        None
    }
}

pub fn positive_int(errors: &mut FieldErrors, field: &str, value: i64) -> Option<u32> {
    match u32::try_from(value) {
        Ok(v) if v > 0 => Some(v),
        _ => {
            errors.add(field, format!("The {} field must be at least 1.", label(field)));
            None
        }
    }
}

pub fn non_negative(errors: &mut FieldErrors, field: &str, value: f64) -> Option<f64> {
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        errors.add(field, format!("The {} field must be at least 0.", label(field)));
        None
    }
}

/// A number given either as JSON number or numeric string.
pub fn parse_number(errors: &mut FieldErrors, field: &str, value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => Some(n),
        _ => {
            errors.add(field, format!("The {} field must be a number.", label(field)));
            None
        }
    }
}

/// A JSON object or array, given either inline or as a string holding
/// JSON text.
pub fn json_document(
    errors: &mut FieldErrors,
    field: &str,
    value: serde_json::Value,
) -> Option<serde_json::Value> {
    let value = match value {
        serde_json::Value::String(raw) => serde_json::from_str(&raw).ok(),
        other => Some(other),
    };
    match value {
        Some(v) if v.is_object() || v.is_array() => Some(v),
        _ => {
            errors.add(field, format!("The {} field must be a valid JSON string.", label(field)));
            None
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Trimmed email, or an error when blank or malformed.
pub fn required_email(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<String> {
    let email = required_text(errors, field, value)?;
    if is_valid_email(&email) {
        Some(email)
    } else {
        errors.add(
            field,
            format!("The {} field must be a valid email address.", label(field)),
        );
        None
    }
}

/// At least eight characters with upper and lower case letters, a digit
/// and a symbol.
pub fn check_password_strength(errors: &mut FieldErrors, field: &str, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            field,
            format!("The {} field must be at least {MIN_PASSWORD_LENGTH} characters.", label(field)),
        );
    }
    if !(password.chars().any(char::is_uppercase) && password.chars().any(char::is_lowercase)) {
        errors.add(
            field,
            format!("The {} field must contain at least one uppercase and one lowercase letter.", label(field)),
        );
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.add(field, format!("The {} field must contain at least one number.", label(field)));
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        errors.add(field, format!("The {} field must contain at least one symbol.", label(field)));
    }
}

/// Minimum length only, used by the public reset flow.
pub fn check_password_length(errors: &mut FieldErrors, field: &str, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            field,
            format!("The {} field must be at least {MIN_PASSWORD_LENGTH} characters.", label(field)),
        );
    }
}

pub fn check_confirmation(
    errors: &mut FieldErrors,
    field: &str,
    password: &str,
    confirmation: Option<&str>,
) {
    if confirmation != Some(password) {
        errors.add(field, format!("The {} field confirmation does not match.", label(field)));
    }
}
