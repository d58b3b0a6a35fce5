use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::store::StoreError;
use crate::validation::FieldErrors;

pub const USER_NOT_FOUND: &str = "User not found";
pub const EMAIL_EXISTS: &str = "Email already exists";
pub const VALIDATION_FAILED: &str = "Validation failed";
pub const INVALID_JSON: &str = "Invalid JSON data";
pub const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("User with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Invalid user id: {0}")]
    InvalidId(String),

    #[error("Invalid JSON data")]
    MalformedInput,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

/// JSON body of every error response from the users routes
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    /// Present for validation and email conflicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<FieldErrors>,
}

impl ErrorBody {
    fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
            errors: None,
        }
    }
}

impl UserError {
    /// Field-keyed view of the error, as returned by the service layer
    pub fn errors(&self) -> FieldErrors {
        let (field, message) = match self {
            UserError::Validation(errors) => return errors.clone(),
            UserError::DuplicateEmail(_) => ("email", EMAIL_EXISTS),
            UserError::NotFound(_) | UserError::InvalidId(_) => ("id", USER_NOT_FOUND),
            UserError::MalformedInput => ("body", INVALID_JSON),
            UserError::Internal(_) => ("server", INTERNAL_ERROR),
        };
        FieldErrors::from([(field.to_string(), message.to_string())])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            UserError::Validation(_) | UserError::DuplicateEmail(_) | UserError::MalformedInput => {
                StatusCode::BAD_REQUEST
            }
            UserError::NotFound(_) | UserError::InvalidId(_) => StatusCode::NOT_FOUND,
            UserError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for UserError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(detail) => UserError::DuplicateEmail(detail),
            StoreError::Database(msg) => UserError::Internal(msg),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            UserError::Validation(_) | UserError::DuplicateEmail(_) => ErrorBody {
                error: VALIDATION_FAILED.to_string(),
                errors: Some(self.errors()),
            },
            UserError::NotFound(_) | UserError::InvalidId(_) => ErrorBody::new(USER_NOT_FOUND),
            UserError::MalformedInput => ErrorBody::new(INVALID_JSON),
            UserError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorBody::new(INTERNAL_ERROR)
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_are_field_keyed() {
        assert_eq!(UserError::NotFound(4).errors()["id"], USER_NOT_FOUND);
        assert_eq!(
            UserError::DuplicateEmail("a@b.co".to_string()).errors()["email"],
            EMAIL_EXISTS
        );

        let fields = FieldErrors::from([("role".to_string(), "bad".to_string())]);
        assert_eq!(UserError::Validation(fields.clone()).errors(), fields);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            UserError::Validation(FieldErrors::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UserError::DuplicateEmail(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(UserError::NotFound(1).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            UserError::InvalidId("abc".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(UserError::MalformedInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            UserError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unique_violation_maps_to_duplicate_email() {
        let err: UserError = StoreError::UniqueViolation("users_email_key".to_string()).into();
        assert!(matches!(err, UserError::DuplicateEmail(_)));
        assert_eq!(err.errors()["email"], EMAIL_EXISTS);
    }
}
