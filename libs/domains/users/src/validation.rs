//! Request-level validation rules for user payloads.
//!
//! Everything here is pure. Violations accumulate into a [`FieldErrors`] map
//! keyed by the JSON field name, one message per field.

use std::collections::BTreeMap;

use validator::{ValidateEmail, ValidationErrors};

use crate::models::{Role, UserInput, UserStatus};

/// Field name to error message
pub type FieldErrors = BTreeMap<String, String>;

pub const FIRST_NAME: &str = "firstName";
pub const LAST_NAME: &str = "lastName";
pub const EMAIL: &str = "email";
pub const ROLE: &str = "role";
pub const STATUS: &str = "status";

pub const NAME_MIN_LENGTH: usize = 2;
pub const NAME_MAX_LENGTH: usize = 255;
pub const EMAIL_MAX_LENGTH: usize = 255;

pub const INVALID_EMAIL: &str = "Invalid email format";
pub const EMAIL_TOO_LONG: &str = "Email must be at most 255 characters";
pub const INVALID_ROLE: &str = "Role must be one of: admin, manager, user";
pub const INVALID_STATUS: &str = "Status must be one of: active, inactive, pending";

fn label(field: &str) -> &str {
    match field {
        FIRST_NAME => "First name",
        LAST_NAME => "Last name",
        EMAIL => "Email",
        ROLE => "Role",
        STATUS => "Status",
        other => other,
    }
}

pub fn required_message(field: &str) -> String {
    format!("{} is required", label(field))
}

fn length_message(field: &str) -> String {
    format!(
        "{} must be between {} and {} characters",
        label(field),
        NAME_MIN_LENGTH,
        NAME_MAX_LENGTH
    )
}

/// Validate a create (`is_update == false`) or partial update payload.
///
/// On create every required field must be present. On update only the
/// supplied fields are checked. `status` is optional in both cases but must be
/// a known value whenever it is supplied.
pub fn validate(input: &UserInput, is_update: bool) -> FieldErrors {
    let mut errors = FieldErrors::new();

    for (field, value) in [
        (FIRST_NAME, &input.first_name),
        (LAST_NAME, &input.last_name),
    ] {
        if let Some(message) = check_required(field, value.as_deref(), is_update)
            .or_else(|| value.as_deref().and_then(|v| check_name_length(field, v)))
        {
            errors.insert(field.to_string(), message);
        }
    }

    if let Some(message) = check_required(EMAIL, input.email.as_deref(), is_update)
        .or_else(|| input.email.as_deref().and_then(check_email))
    {
        errors.insert(EMAIL.to_string(), message);
    }

    if let Some(message) = check_required(ROLE, input.role.as_deref(), is_update).or_else(|| {
        input
            .role
            .as_deref()
            .and_then(|raw| parse_role(raw).err())
    }) {
        errors.insert(ROLE.to_string(), message);
    }

    if let Some(message) = input
        .status
        .as_deref()
        .and_then(|raw| parse_status(raw).err())
    {
        errors.insert(STATUS.to_string(), message);
    }

    errors
}

/// A field is required on create, and on update only once supplied.
/// Blank strings never satisfy the requirement.
fn check_required(field: &str, value: Option<&str>, is_update: bool) -> Option<String> {
    match value {
        Some(v) if v.trim().is_empty() => Some(required_message(field)),
        None if !is_update => Some(required_message(field)),
        _ => None,
    }
}

/// Length is measured without surrounding whitespace.
fn check_name_length(field: &str, value: &str) -> Option<String> {
    let len = value.trim().chars().count();
    if (NAME_MIN_LENGTH..=NAME_MAX_LENGTH).contains(&len) {
        None
    } else {
        Some(length_message(field))
    }
}

fn check_email(value: &str) -> Option<String> {
    if !value.validate_email() {
        Some(INVALID_EMAIL.to_string())
    } else if value.chars().count() > EMAIL_MAX_LENGTH {
        Some(EMAIL_TOO_LONG.to_string())
    } else {
        None
    }
}

pub fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse().map_err(|_| INVALID_ROLE.to_string())
}

pub fn parse_status(raw: &str) -> Result<UserStatus, String> {
    raw.parse().map_err(|_| INVALID_STATUS.to_string())
}

/// Lowercase an email for storage and uniqueness checks
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Convert entity-level `validator` errors into the request error shape
pub fn from_validation_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .iter()
        .filter_map(|(field, errs)| {
            let message = errs.first()?.message.as_ref()?.to_string();
            let key = match field.as_ref() {
                "first_name" => FIRST_NAME,
                "last_name" => LAST_NAME,
                other => other,
            };
            Some((key.to_string(), message))
        })
        .collect()
}
