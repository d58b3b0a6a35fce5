use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use migration::Migrator;
use tracing::info;

mod api;
mod config;
mod openapi;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first so start-up failures are reported with context
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);

    info!(
        name = config.app.name,
        version = config.app.version,
        environment = ?config.environment,
        "Starting users API"
    );

    let db = database::postgres::connect_with_retry(&config.database, config.retry.clone())
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    if config.run_migrations {
        database::postgres::run_migrations::<Migrator>(&db)
            .await
            .map_err(|e| eyre::eyre!("Migrations failed: {}", e))?;
    } else {
        info!("RUN_MIGRATIONS=false, skipping migrations");
    }

    let router = create_router::<openapi::ApiDoc>(api::postgres_routes(db.clone()));

    // - /health: liveness with app name/version
    // - /ready: readiness with a database round trip
    let app = router
        .merge(health_router(config.app.clone()))
        .merge(api::ready_router(db.clone()));

    create_production_app(app, &config.server, async move {
        info!("Shutting down: closing database connections");
        if let Err(e) = database::postgres::close(db).await {
            tracing::error!("Error closing PostgreSQL: {}", e);
        }
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Users API shutdown complete");
    Ok(())
}
