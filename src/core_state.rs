//! Process-wide application state shared by every request.
//!
//! Holds only immutable configuration, the token signer and the mailer.
//! Each request opens its own SQLite connection through `open_db`.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::crypto::TokenSigner;
use crate::db;
use crate::mail::{mailer_from_config, Mailer};

pub struct CoreState {
    pub config: AppConfig,
    pub tokens: TokenSigner,
    pub mailer: Arc<dyn Mailer>,
}

impl CoreState {
    /// Build state with the mailer selected by configuration.
    pub fn new(config: AppConfig) -> Self {
        let mailer = mailer_from_config(&config.mail);
        Self::with_mailer(config, mailer)
    }

    pub fn with_mailer(config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let tokens = TokenSigner::new(config.jwt_secret.as_bytes());
        Self {
            config,
            tokens,
            mailer,
        }
    }

    /// Open a connection to the configured database.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.config.database_path).map_err(CoreError::Database)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}
