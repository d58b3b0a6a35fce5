//! PostgreSQL connector: pool configuration, start-up retry, migrations and
//! health checks.

mod config;
mod connector;
mod health;

pub use config::PostgresConfig;
pub use connector::{close, connect, connect_with_retry, run_migrations};
pub use health::check_health;

// Re-export SeaORM types for convenience
pub use sea_orm::{DatabaseConnection, DbErr};
pub use sea_orm_migration::MigratorTrait;
