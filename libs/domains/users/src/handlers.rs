use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request, State, rejection::QueryRejection,
    },
    http::{HeaderMap, StatusCode, request::Parts},
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{AuditEvent, AuditOutcome, extract_ip_from_headers, extract_user_agent};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::error::{ErrorBody, UserError, UserResult};
use crate::models::{ListQuery, Pagination, Role, User, UserInput, UserStatus, UserView};
use crate::service::UserService;
use crate::store::UserStore;

pub const TAG: &str = "users";

pub const USER_CREATED: &str = "User created successfully";
pub const USER_UPDATED: &str = "User updated successfully";
pub const USER_DELETED: &str = "User deleted successfully";

/// OpenAPI documentation for Users API
#[derive(OpenApi)]
#[openapi(
    paths(list_users, create_user, get_user, update_user, delete_user),
    components(schemas(
        UserView,
        UserInput,
        Role,
        UserStatus,
        Pagination,
        UserListResponse,
        UserResponse,
        MessageResponse,
        ErrorBody
    )),
    tags(
        (name = TAG, description = "User management endpoints")
    )
)]
pub struct ApiDoc;

/// Create the users router with all HTTP endpoints
pub fn router<S: UserStore + 'static>(service: UserService<S>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .with_state(shared_service)
}

/// Numeric `{id}` path segment.
///
/// Anything that is not an integer cannot name a user, so it is rejected as
/// not found rather than as a bad request.
pub struct UserId(pub i64);

impl<St> FromRequestParts<St> for UserId
where
    St: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request_parts(parts: &mut Parts, state: &St) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| UserError::InvalidId(e.body_text()))?;

        raw.parse()
            .map(UserId)
            .map_err(|_| UserError::InvalidId(raw))
    }
}

/// JSON body decoded into [`UserInput`].
///
/// The content type is not checked. Any body that is not a JSON object with
/// string (or null) values for the known keys is rejected as invalid JSON;
/// arrays are refused before they can fill fields by position.
pub struct UserPayload(pub UserInput);

impl<St> FromRequest<St> for UserPayload
where
    St: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| UserError::MalformedInput)?;

        match serde_json::from_slice::<Value>(&body) {
            Ok(value @ Value::Object(_)) => serde_json::from_value(value)
                .map(UserPayload)
                .map_err(|_| UserError::MalformedInput),
            _ => Err(UserError::MalformedInput),
        }
    }
}

/// Page of users with pagination metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserView>,
    pub pagination: Pagination,
}

/// Single user, with a confirmation message on writes
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub data: UserView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// List users, newest first.
///
/// A query string that does not decode (e.g. a repeated `page`) is treated as
/// absent so the defaults apply.
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(ListQuery),
    responses(
        (status = 200, description = "Page of users", body = UserListResponse),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
async fn list_users<S: UserStore>(
    State(service): State<Arc<UserService<S>>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> UserResult<Json<UserListResponse>> {
    let (page, limit) = query.map(|Query(q)| q).unwrap_or_default().clamped();
    let result = service.list_users(page, limit).await?;

    Ok(Json(UserListResponse {
        data: result.users.into_iter().map(UserView::from).collect(),
        pagination: Pagination {
            page: result.page,
            limit: result.limit,
            total: result.total,
            total_pages: result.total_pages,
        },
    }))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = UserInput,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed, email taken or invalid JSON", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
async fn create_user<S: UserStore>(
    State(service): State<Arc<UserService<S>>>,
    headers: HeaderMap,
    UserPayload(input): UserPayload,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(input).await?;

    AuditEvent::new(
        None,
        "user.create",
        Some(format!("user:{}", user.id)),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .with_details(created_details(&user))
    .log();

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            data: user.into(),
            message: Some(USER_CREATED.to_string()),
        }),
    ))
}

/// Audit details for `user.create`: the role only, no personal data
fn created_details(user: &User) -> Value {
    json!({ "role": user.role })
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
async fn get_user<S: UserStore>(
    State(service): State<Arc<UserService<S>>>,
    UserId(id): UserId,
) -> UserResult<Json<UserResponse>> {
    let user = service.get_user(id).await?;

    Ok(Json(UserResponse {
        data: user.into(),
        message: None,
    }))
}

/// Partially update a user
#[utoipa::path(
    put,
    path = "/{id}",
    tag = TAG,
    params(("id" = i64, Path, description = "User ID")),
    request_body = UserInput,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation failed, email taken or invalid JSON", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
async fn update_user<S: UserStore>(
    State(service): State<Arc<UserService<S>>>,
    UserId(id): UserId,
    headers: HeaderMap,
    UserPayload(input): UserPayload,
) -> UserResult<Json<UserResponse>> {
    let changed: Vec<&str> = [
        ("firstName", input.first_name.is_some()),
        ("lastName", input.last_name.is_some()),
        ("email", input.email.is_some()),
        ("role", input.role.is_some()),
        ("status", input.status.is_some()),
    ]
    .into_iter()
    .filter_map(|(field, present)| present.then_some(field))
    .collect();

    let user = service.update_user(id, input).await?;

    AuditEvent::new(
        None,
        "user.update",
        Some(format!("user:{}", user.id)),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .with_details(json!({ "fields": changed }))
    .log();

    Ok(Json(UserResponse {
        data: user.into(),
        message: Some(USER_UPDATED.to_string()),
    }))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = TAG,
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
async fn delete_user<S: UserStore>(
    State(service): State<Arc<UserService<S>>>,
    UserId(id): UserId,
    headers: HeaderMap,
) -> UserResult<Json<MessageResponse>> {
    service.delete_user(id).await?;

    AuditEvent::new(
        None,
        "user.delete",
        Some(format!("user:{}", id)),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok(Json(MessageResponse {
        message: USER_DELETED.to_string(),
    }))
}
