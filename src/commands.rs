//! CLI command definitions and dispatch.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use filedrop_core::config::{AppConfig, DatabaseBackend};
use filedrop_core::error::AppError;
use filedrop_database::repositories::RepositorySet;
use filedrop_database::{connect_pool, migration};
use filedrop_storage::LocalStorageProvider;
use filedrop_worker::MaintenanceService;

/// FileDrop — upload intake with periodic storage maintenance
#[derive(Debug, Parser)]
#[command(name = "filedrop", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding `default.toml` and environment overlays
    #[arg(long, default_value = "config")]
    pub config_dir: String,

    /// Environment overlay to apply on top of `default.toml`
    #[arg(short, long, env = "FILEDROP_ENV", default_value = "development")]
    pub env: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the maintenance scheduler until interrupted
    Serve,
    /// Run one maintenance task immediately and print its summary
    RunTask {
        /// Task name: upload_drain, retention_sweep or row_cap_sweep
        name: String,
    },
    /// Apply pending database migrations
    Migrate,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Serve => serve(config).await,
            Commands::RunTask { name } => run_task(config, name).await,
            Commands::Migrate => migrate(config).await,
        }
    }
}

async fn build_service(config: &AppConfig) -> Result<MaintenanceService, AppError> {
    let storage = LocalStorageProvider::new(&config.storage.root_path).await?;
    tracing::info!("Storing uploads under '{}'", storage.root().display());

    let repositories = RepositorySet::connect(&config.database).await?;

    MaintenanceService::new(
        &config.maintenance,
        &config.storage.upload_dir,
        Arc::new(storage),
        &repositories,
    )
}

async fn serve(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting FileDrop v{}", env!("CARGO_PKG_VERSION"));

    let service = build_service(&config).await?;
    service.on_startup().await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for shutdown signal: {}", e)))?;
    tracing::info!("Shutdown signal received");

    service.on_shutdown().await?;
    tracing::info!("FileDrop shut down complete");
    Ok(())
}

async fn run_task(config: AppConfig, name: &str) -> Result<(), AppError> {
    let service = build_service(&config).await?;
    let summary = service.run_task(name).await?;

    if let Some(summary) = summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

async fn migrate(config: AppConfig) -> Result<(), AppError> {
    if config.database.backend != DatabaseBackend::Postgres {
        return Err(AppError::configuration(
            "migrate requires database.backend = \"postgres\"",
        ));
    }

    let pool = connect_pool(&config.database).await?;
    migration::run_migrations(&pool).await?;
    pool.close().await;
    Ok(())
}
