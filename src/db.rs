//! Database module
//!
//! Connection pool and schema checks for the audit trail.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Tables the audit store writes to
const REQUIRED_TABLES: &[&str] = &["audit_logs"];

/// Open the connection pool
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!(
                "Required table '{}' does not exist. Apply migrations/0001_audit_logs.sql.",
                table
            );
            return Ok(false);
        }
    }

    Ok(true)
}
