//! SQLite storage backend for the fail2ban attempt log.
//!
//! # Example
//!
//! ```rust,no_run
//! use fail2ban_core::repositories::RepositoryProvider;
//! use fail2ban_storage_sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), fail2ban_core::Error> {
//! let storage = SqliteStorage::connect("sqlite://fail2ban.db").await?;
//! let repositories = storage.into_repository_provider();
//! repositories.migrate().await?;
//! # Ok(())
//! # }
//! ```

pub mod migrations;
pub mod repositories;

use std::str::FromStr;

use fail2ban_core::{Error, error::StorageError};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub use repositories::{SqliteAttemptRepository, SqliteRepositoryProvider};

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `url`, creating the database file if it doesn't exist.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| {
                tracing::error!(error = %e, url, "Invalid SQLite URL");
                StorageError::Connection(format!("Invalid SQLite URL: {url}"))
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to SQLite");
                StorageError::Connection("Failed to connect to SQLite".to_string())
            })?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn into_repository_provider(self) -> SqliteRepositoryProvider {
        SqliteRepositoryProvider::new(self.pool)
    }
}
