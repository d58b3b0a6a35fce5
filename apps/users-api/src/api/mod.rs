use axum::{Router, routing::get};
use database::postgres::DatabaseConnection;
use domain_users::{PgUserStore, UserStore, UserService, handlers};

pub mod health;

/// API routes without the `/api` prefix; `create_router` adds it.
pub fn routes<S: UserStore + 'static>(service: UserService<S>) -> Router {
    Router::new().nest("/users", handlers::router(service))
}

/// Routes backed by PostgreSQL
pub fn postgres_routes(db: DatabaseConnection) -> Router {
    routes(UserService::new(PgUserStore::new(db)))
}

/// `/ready`, checking the database connection on each call.
pub fn ready_router(db: DatabaseConnection) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(db)
}
