use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::common::DatabaseError;

/// Run `SELECT 1` and return how long it took.
///
/// Used by readiness checks; any failure is reported as
/// [`DatabaseError::HealthCheckFailed`].
pub async fn check_health(db: &DatabaseConnection) -> Result<Duration, DatabaseError> {
    let start = Instant::now();

    let stmt = Statement::from_string(DatabaseBackend::Postgres, "SELECT 1".to_owned());
    db.query_one_raw(stmt)
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(format!("PostgreSQL: {}", e)))?;

    let elapsed = start.elapsed();
    debug!(elapsed_ms = elapsed.as_millis() as u64, "PostgreSQL health check passed");
    Ok(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, MockDatabase};

    #[tokio::test]
    async fn test_check_health_failure_is_reported() {
        // A mock with no prepared results fails every query
        let db = MockDatabase::new(DbBackend::Postgres).into_connection();

        let err = check_health(&db).await.unwrap_err();
        assert!(matches!(err, DatabaseError::HealthCheckFailed(_)));
    }
}
