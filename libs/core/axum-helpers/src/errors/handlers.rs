use axum::{
    http::{Method, Uri},
    response::{IntoResponse, Response},
};

use super::AppError;

/// Router fallback for paths that match no route.
pub async fn not_found(method: Method, uri: Uri) -> Response {
    AppError::NotFound(format!("No route for {} {}", method, uri.path())).into_response()
}

/// Fallback for known paths called with an unsupported method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    AppError::MethodNotAllowed(format!("{} is not allowed on {}", method, uri.path()))
        .into_response()
}
