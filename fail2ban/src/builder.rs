//! Builder pattern for constructing Fail2Ban instances
//!
//! This module provides a type-safe builder for creating [`Fail2Ban`] instances with
//! compile-time validation of storage configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use fail2ban::Fail2BanBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build with SQLite and auto-migration
//!     let fail2ban = Fail2BanBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     // Or build without auto-migration and run manually
//!     let fail2ban = Fail2BanBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .build()
//!         .await?;
//!     fail2ban.migrate().await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use fail2ban_core::{
    Clock, PolicyConfig, SystemClock,
    repositories::{InMemoryRepositoryProvider, RepositoryProvider},
};

use crate::Fail2Ban;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when building a Fail2Ban instance.
#[derive(Debug, thiserror::Error)]
pub enum Fail2BanBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// ============================================================================
// Type-State Markers
// ============================================================================

/// Marker type indicating no storage has been configured yet.
///
/// This is the initial state of [`Fail2BanBuilder`].
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

// ============================================================================
// Builder Implementation
// ============================================================================

/// A type-safe builder for constructing [`Fail2Ban`] instances.
///
/// # Type States
///
/// - [`NoStorage`]: Initial state, storage must be configured
/// - [`WithStorage<R>`]: Storage configured, ready to build or add more configuration
pub struct Fail2BanBuilder<Storage> {
    storage: Storage,
    policy: PolicyConfig,
    clock: Arc<dyn Clock>,
    apply_migrations: bool,
}

impl Default for Fail2BanBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl Fail2BanBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Policy: 3 failures within 600 seconds, banned for 1800 seconds
    /// - Clock: system time
    /// - Apply migrations: false
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            policy: PolicyConfig::default(),
            clock: Arc::new(SystemClock),
            apply_migrations: false,
        }
    }

    fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> Fail2BanBuilder<WithStorage<R>> {
        Fail2BanBuilder {
            storage: WithStorage { repositories },
            policy: self.policy,
            clock: self.clock,
            apply_migrations: self.apply_migrations,
        }
    }

    /// Keep the attempt log in process memory. Nothing survives a restart.
    pub fn with_memory(self) -> Fail2BanBuilder<WithStorage<InMemoryRepositoryProvider>> {
        self.with_repositories(Arc::new(InMemoryRepositoryProvider::new()))
    }

    /// Use a repository provider supplied by the caller.
    pub fn with_repository_provider<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> Fail2BanBuilder<WithStorage<R>> {
        self.with_repositories(repositories)
    }
}

// ============================================================================
// Storage Configuration Methods (NoStorage -> WithStorage)
// ============================================================================

#[cfg(feature = "sqlite")]
impl Fail2BanBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://path/to/db.sqlite")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<Fail2BanBuilder<WithStorage<crate::SqliteRepositoryProvider>>, Fail2BanBuilderError>
    {
        let storage = crate::SqliteStorage::connect(url)
            .await
            .map_err(|e| Fail2BanBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(storage.into_repository_provider())))
    }

    /// Configure SQLite storage with an existing connection pool.
    ///
    /// Use this when the application already owns a pool and the attempt log
    /// should live next to its other tables.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use fail2ban::Fail2BanBuilder;
    /// use sqlx::SqlitePool;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let pool = SqlitePool::connect("sqlite::memory:").await?;
    ///
    /// let fail2ban = Fail2BanBuilder::new()
    ///     .with_sqlite_pool(pool)
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> Fail2BanBuilder<WithStorage<crate::SqliteRepositoryProvider>> {
        self.with_repositories(Arc::new(crate::SqliteRepositoryProvider::new(pool)))
    }
}

// ============================================================================
// Configuration Methods (available after storage is configured)
// ============================================================================

impl<R: RepositoryProvider> Fail2BanBuilder<WithStorage<R>> {
    /// Set the initial ban policy. It can still be changed later with
    /// [`Fail2Ban::update_policy`].
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use fail2ban::{Fail2BanBuilder, PolicyConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let fail2ban = Fail2BanBuilder::new()
    ///     .with_memory()
    ///     .with_policy(PolicyConfig::new(5, 300, 3600)?)
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    /// Read the policy from `FAIL2BAN_MAX_RETRY`, `FAIL2BAN_FIND_TIME` and
    /// `FAIL2BAN_BAN_TIME`, falling back to defaults for unset variables.
    pub fn with_policy_from_env(mut self) -> Result<Self, Fail2BanBuilderError> {
        self.policy = PolicyConfig::from_env()
            .map_err(|e| Fail2BanBuilderError::InvalidConfiguration(e.to_string()))?;
        Ok(self)
    }

    /// Replace the time source. Tests use a [`ManualClock`](crate::ManualClock).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set whether to automatically apply database migrations during build.
    ///
    /// Default: false
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    /// Build the Fail2Ban instance, running migrations first if requested.
    pub async fn build(self) -> Result<Fail2Ban<R>, Fail2BanBuilderError> {
        if self.apply_migrations {
            self.storage
                .repositories
                .migrate()
                .await
                .map_err(|e| Fail2BanBuilderError::Migration(e.to_string()))?;
        }

        Ok(Fail2Ban::from_parts(
            self.storage.repositories,
            self.policy,
            self.clock,
        ))
    }
}
