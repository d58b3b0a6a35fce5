use crate::errors::handlers::{method_not_allowed, not_found};
use super::shutdown::shutdown_signal;
use axum::Router;
use core_config::server::ServerConfig;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Path the OpenAPI document is served from
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Wraps API routes with documentation, fallbacks and request tracing.
///
/// - Swagger UI at `/swagger-ui`, backed by [`OPENAPI_JSON_PATH`]
/// - `apis` nested under `/api`
/// - JSON 404 for unknown paths, JSON 405 for unsupported methods
/// - a `TraceLayer` span per request
///
/// Health endpoints are not included; merge [`super::health_router`] and the
/// app's own readiness route into the result.
///
/// ```ignore
/// use axum::Router;
/// use axum_helpers::server::create_router;
///
/// let api_routes = Router::new().nest("/users", domain_users::router(service));
/// let router = create_router::<ApiDoc>(api_routes);
/// ```
pub fn create_router<T>(apis: Router) -> Router
where
    T: OpenApi + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url(OPENAPI_JSON_PATH, T::openapi()))
        .nest("/api", apis)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Serve `router` until SIGINT/SIGTERM, then run `cleanup`.
///
/// In-flight requests are drained before `cleanup` starts. `cleanup` is given
/// at most `server_config.shutdown_timeout`; past that it is abandoned and a
/// warning is logged.
///
/// ```ignore
/// let cleanup = async move {
///     if let Err(e) = database::postgres::close(db).await {
///         tracing::error!("Error closing database pool: {}", e);
///     }
/// };
///
/// create_production_app(router, &config.server, cleanup).await?;
/// ```
pub async fn create_production_app<F>(
    router: Router,
    server_config: &ServerConfig,
    cleanup: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(server_config.address()).await?;
    serve_until(
        listener,
        router,
        shutdown_signal(),
        cleanup,
        server_config.shutdown_timeout,
    )
    .await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_until<S, F>(
    listener: TcpListener,
    router: Router,
    shutdown: S,
    cleanup: F,
    cleanup_timeout: Duration,
) -> io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    info!("Server starting on {}", listener.local_addr()?);

    let serve_result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .inspect_err(|e| {
            tracing::error!("Server encountered an error: {:?}", e);
        });

    info!("Starting cleanup tasks (timeout: {:?})", cleanup_timeout);
    match tokio::time::timeout(cleanup_timeout, cleanup).await {
        Ok(()) => info!("Cleanup completed successfully"),
        Err(_) => warn!(
            "Cleanup exceeded timeout of {:?}, forcing shutdown",
            cleanup_timeout
        ),
    }

    serve_result
}
