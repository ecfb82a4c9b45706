pub mod api;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod listing;
pub mod mailer;
pub mod models;
pub mod report;
pub mod validation;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::api::ServerError;
use crate::config::ServerConfig;
use crate::core_state::{CoreError, CoreState};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Initialization failed: {0}")]
    Core(#[from] CoreError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Read configuration from the environment, prepare the database and
/// serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServerConfig::from_env();
    tracing::info!(
        database = %config.database_path.display(),
        cors_origin = %config.cors_origin,
        "Configuration loaded"
    );
    if config.admin_seed.is_none() {
        tracing::debug!("No admin seed configured");
    }

    let core = Arc::new(CoreState::with_config(config));
    core.initialize()?;

    api::serve(core, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        // Without a signal handler, keep serving.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
