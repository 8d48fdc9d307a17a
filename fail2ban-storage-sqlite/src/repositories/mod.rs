//! Repository implementations for SQLite storage

pub mod attempt;

pub use attempt::SqliteAttemptRepository;

use async_trait::async_trait;
use fail2ban_core::{
    Error,
    error::DatabaseResultExt,
    repositories::{AttemptRepositoryProvider, RepositoryProvider},
};
use fail2ban_migration::MigrationManager;
use sqlx::SqlitePool;

use crate::migrations::{SqliteMigrationManager, migrations};

/// Repository provider implementation for SQLite
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    attempts: SqliteAttemptRepository,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let attempts = SqliteAttemptRepository::new(pool.clone());
        Self { pool, attempts }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl AttemptRepositoryProvider for SqliteRepositoryProvider {
    type AttemptRepo = SqliteAttemptRepository;

    fn attempts(&self) -> &Self::AttemptRepo {
        &self.attempts
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
        })?;
        manager.up(&migrations()).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
        })?;

        Ok(())
    }

    async fn uninstall(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await?;
        manager.down(&migrations()).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to roll back migrations");
        })?;

        tracing::info!("Dropped attempt log");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_db_err("Health check failed")?;
        Ok(())
    }
}
