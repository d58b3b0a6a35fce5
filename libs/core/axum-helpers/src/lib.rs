//! # Axum Helpers
//!
//! Cross-cutting pieces shared by the HTTP services:
//!
//! - **[`server`]**: router assembly with OpenAPI docs, health/readiness
//!   endpoints, graceful shutdown with a bounded cleanup window
//! - **[`errors`]**: JSON error bodies with stable error codes, router fallbacks
//! - **[`audit`]**: structured audit events on the `audit` tracing target
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::server::{create_production_app, create_router, health_router};
//! use core_config::{app_info, server::ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let api_routes = Router::new(); // Add your routes
//!     let app = create_router::<ApiDoc>(api_routes).merge(health_router(app_info!()));
//!
//!     create_production_app(app, &ServerConfig::default(), async {}).await
//! }
//! ```

pub mod audit;
pub mod errors;
pub mod server;

// Re-export server types
pub use server::{
    HealthCheckFuture, HealthResponse, create_production_app, create_router, health_router,
    run_health_checks, serve_until, shutdown_signal,
};

// Re-export error types
pub use errors::{AppError, ErrorCode, ErrorResponse};

// Re-export audit types
pub use audit::{AuditEvent, AuditOutcome, extract_ip_from_headers, extract_user_agent};
