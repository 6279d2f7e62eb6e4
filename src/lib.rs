pub mod api;
pub mod appointment;
pub mod authorization;
pub mod bootstrap;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod mail;
pub mod models;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core_state::CoreState;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Server error: {0}")]
    Server(#[from] api::server::ServerError),
    #[error("Upload directory error: {0}")]
    UploadDir(#[from] std::io::Error),
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Load configuration, prepare storage, and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    std::fs::create_dir_all(&config.upload_dir)?;

    // Migrations run on open; fail fast before binding.
    let conn = db::open_database(&config.database_path)?;
    if let Some(admin) = &config.admin {
        bootstrap::ensure_admin(&conn, admin)?;
    }
    drop(conn);

    tracing::info!(
        database = %config.database_path.display(),
        uploads = %config.upload_dir.display(),
        environment = ?config.environment,
        "storage ready"
    );

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let core = Arc::new(CoreState::new(config));
    let mut server = api::start_api_server(core, addr).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
