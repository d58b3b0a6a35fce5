use chrono::{DateTime, Duration, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::validation::{self, FieldErrors};

/// Wire format for timestamps in API responses
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// User roles
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "user")]
    User,
}

/// Account status
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    /// Assigned when a user is created without an explicit status
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// User entity
///
/// The `Validate` rules mirror [`validation::validate`] and carry the same
/// messages, so a record that slips past request validation is still rejected
/// before it reaches storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Storage-assigned identifier
    pub id: i64,
    #[validate(
        custom(function = "not_blank", message = "First name is required"),
        length(min = 2, max = 255, message = "First name must be between 2 and 255 characters")
    )]
    pub first_name: String,
    #[validate(
        custom(function = "not_blank", message = "Last name is required"),
        length(min = 2, max = 255, message = "Last name must be between 2 and 255 characters")
    )]
    pub last_name: String,
    /// Stored lowercased; unique across all users
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user that has not been persisted yet (no id)
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct NewUser {
    #[validate(
        custom(function = "not_blank", message = "First name is required"),
        length(min = 2, max = 255, message = "First name must be between 2 and 255 characters")
    )]
    pub first_name: String,
    #[validate(
        custom(function = "not_blank", message = "Last name is required"),
        length(min = 2, max = 255, message = "Last name must be between 2 and 255 characters")
    )]
    pub last_name: String,
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewUser {
    /// Build a new user from request input, stamping both timestamps with `now`.
    ///
    /// Missing or unparseable fields are reported with the same messages as
    /// [`validation::validate`].
    pub fn from_input(input: UserInput, now: DateTime<Utc>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let first_name = take_required(input.first_name, validation::FIRST_NAME, &mut errors);
        let last_name = take_required(input.last_name, validation::LAST_NAME, &mut errors);
        let email = take_required(input.email, validation::EMAIL, &mut errors);
        let role = match input.role.as_deref() {
            Some(raw) => record(validation::parse_role(raw), validation::ROLE, &mut errors),
            None => {
                errors.insert(
                    validation::ROLE.to_string(),
                    validation::required_message(validation::ROLE),
                );
                None
            }
        };
        let status = match input.status.as_deref() {
            Some(raw) => record(validation::parse_status(raw), validation::STATUS, &mut errors),
            None => Some(UserStatus::default()),
        };

        match (first_name, last_name, email, role, status) {
            (Some(first_name), Some(last_name), Some(email), Some(role), Some(status))
                if errors.is_empty() =>
            {
                Ok(Self {
                    first_name,
                    last_name,
                    email,
                    role,
                    status,
                    created_at: now,
                    updated_at: now,
                })
            }
            _ => Err(errors),
        }
    }
}

fn take_required(value: Option<String>, field: &str, errors: &mut FieldErrors) -> Option<String> {
    if value.is_none() {
        errors.insert(field.to_string(), validation::required_message(field));
    }
    value
}

fn record<T>(parsed: Result<T, String>, field: &str, errors: &mut FieldErrors) -> Option<T> {
    match parsed {
        Ok(value) => Some(value),
        Err(message) => {
            errors.insert(field.to_string(), message);
            None
        }
    }
}

impl User {
    /// Attach a storage-assigned id to a new user
    pub fn from_new(id: i64, user: NewUser) -> Self {
        Self {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    /// Apply a partial update. Only fields present in `input` change.
    pub fn apply_input(&mut self, input: UserInput) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        let role = input
            .role
            .as_deref()
            .map(|raw| record(validation::parse_role(raw), validation::ROLE, &mut errors));
        let status = input
            .status
            .as_deref()
            .map(|raw| record(validation::parse_status(raw), validation::STATUS, &mut errors));

        if !errors.is_empty() {
            return Err(errors);
        }

        if let Some(first_name) = input.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = input.last_name {
            self.last_name = last_name;
        }
        if let Some(email) = input.email {
            self.email = email;
        }
        if let Some(Some(role)) = role {
            self.role = role;
        }
        if let Some(Some(status)) = status {
            self.status = status;
        }
        Ok(())
    }

    /// Refresh `updated_at`, keeping it strictly greater than its previous value
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}

/// Raw create/update payload.
///
/// Role and status stay as strings here so that unknown values surface as
/// field errors instead of deserialization failures.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// One of `admin`, `manager`, `user`
    pub role: Option<String>,
    /// One of `active`, `inactive`, `pending`
    pub status: Option<String>,
}

/// JSON projection of a user returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub created_at: String,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub updated_at: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            status: user.status,
            created_at: user.created_at.format(TIMESTAMP_FORMAT).to_string(),
            updated_at: user.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// One page of users, newest first
#[derive(Debug, Clone, PartialEq)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Query parameters for listing users.
///
/// Values are kept raw and clamped by [`ListQuery::clamped`].
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Page number, starting at 1 (default 1)
    #[param(value_type = Option<u64>)]
    pub page: Option<String>,
    /// Page size between 1 and 100 (default 10)
    #[param(value_type = Option<u64>)]
    pub limit: Option<String>,
}

impl ListQuery {
    /// Returns `(page, limit)` with `page >= 1` and `1 <= limit <= 100`
    pub fn clamped(&self) -> (u64, u64) {
        let page = parse_or(self.page.as_deref(), DEFAULT_PAGE as i64).max(1);
        let limit = parse_or(self.limit.as_deref(), DEFAULT_LIMIT as i64).clamp(1, MAX_LIMIT as i64);
        (page as u64, limit as u64)
    }
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse().ok()).unwrap_or(default)
}

/// Pagination block of the list response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}
