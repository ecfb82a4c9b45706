//! Application state shared by every request handler.
//!
//! `CoreState` holds the configuration and the mail transport. It owns no
//! database connection: each request opens its own through [`CoreState::open_db`].

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use crate::config::{AdminSeed, ServerConfig};
use crate::crypto::{self, CryptoError};
use crate::db::{self, DatabaseError};
use crate::mailer::{LogMailer, Mailer};
use crate::models::enums::Role;
use crate::models::NewUser;

pub struct CoreState {
    pub config: ServerConfig,
    mailer: Arc<dyn Mailer>,
}

impl CoreState {
    pub fn new(config: ServerConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self { config, mailer }
    }

    /// State with the logging mailer.
    pub fn with_config(config: ServerConfig) -> Self {
        Self::new(config, Arc::new(LogMailer))
    }

    /// Prepare storage: create the data directory, run migrations, drop
    /// expired tokens and seed the admin account when configured.
    pub fn initialize(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = self.open_db()?;
        let purged = db::purge_expired_tokens(&conn, db::timestamp())?;
        if purged > 0 {
            tracing::debug!(purged, "Expired tokens removed");
        }
        if let Some(seed) = &self.config.admin_seed {
            if ensure_admin(&conn, seed, self.config.pbkdf2_iterations)? {
                tracing::info!(email = %seed.email, "Admin account created");
            }
        }
        Ok(())
    }

    /// Open a database connection for one request.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.config.database_path).map_err(CoreError::Database)
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub fn access_token_expiry(&self, now: NaiveDateTime) -> NaiveDateTime {
        now + Duration::minutes(self.config.access_token_ttl_minutes)
    }

    pub fn refresh_token_expiry(&self, now: NaiveDateTime) -> NaiveDateTime {
        now + Duration::days(self.config.refresh_token_ttl_days)
    }

    pub fn hash_password(&self, password: &str) -> Result<String, CoreError> {
        crypto::hash_password(password, self.config.pbkdf2_iterations).map_err(CoreError::from)
    }
}

/// Create the seeded admin unless an account already uses its email.
/// Returns `true` when an account was created.
pub fn ensure_admin(
    conn: &rusqlite::Connection,
    seed: &AdminSeed,
    iterations: u32,
) -> Result<bool, CoreError> {
    if db::email_taken(conn, &seed.email, None)? {
        return Ok(false);
    }
    let password_hash = crypto::hash_password(&seed.password, iterations)?;
    db::insert_user(
        conn,
        &NewUser {
            first_name: "Admin".into(),
            last_name: "RenalCare".into(),
            email: seed.email.trim().to_string(),
            contact: None,
            role: Role::Admin,
            password_hash,
        },
    )?;
    Ok(true)
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
