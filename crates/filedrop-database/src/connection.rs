//! PostgreSQL pool construction for the repository set.

use std::str::FromStr;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use filedrop_core::config::DatabaseConfig;
use filedrop_core::error::{AppError, ErrorKind};
use filedrop_core::result::AppResult;

/// Parse `database.url` and open a pool sized by the configuration.
pub async fn connect_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    let (options, target) = parse_url(&config.url)?;
    tracing::info!(
        target_db = %target,
        max_connections = config.max_connections,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .connect_with(options)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to connect to {target}"),
                e,
            )
        })?;

    Ok(pool)
}

/// Connect options plus a `user@host:port/db` label that is safe to log.
fn parse_url(url: &str) -> AppResult<(PgConnectOptions, String)> {
    let options = PgConnectOptions::from_str(url).map_err(|e| {
        AppError::with_source(ErrorKind::Configuration, "Invalid database.url", e)
    })?;
    let target = format!(
        "{}@{}:{}/{}",
        options.get_username(),
        options.get_host(),
        options.get_port(),
        options.get_database().unwrap_or_default()
    );
    Ok((options, target))
}
