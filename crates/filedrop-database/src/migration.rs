//! Embedded schema migrations for the `files`, `users` and `items` tables.

use sqlx::PgPool;
use sqlx::migrate::Migrator;

use filedrop_core::error::{AppError, ErrorKind};
use filedrop_core::result::AppResult;

/// Migrations compiled in from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Bring the schema up to date.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Schema migration failed", e)
    })?;

    tracing::info!(known = MIGRATOR.iter().count(), "Schema is up to date");
    Ok(())
}
