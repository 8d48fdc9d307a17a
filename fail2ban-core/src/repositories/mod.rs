//! Repository traits for data access layer
//!
//! This module defines the storage interface the throttle services use to read and
//! append login attempts.
//!
//! # Trait Hierarchy
//!
//! - [`AttemptRepository`] defines the append-only attempt log operations
//! - [`AttemptRepositoryProvider`] gives access to a backend's attempt repository
//! - [`RepositoryProvider`] adds lifecycle methods (install, uninstall, health check)
//!
//! Any backend able to append, return the top-N most recent records per key and the
//! latest timestamp per key filtered by kind can implement these traits: a relational
//! table, an ordered log, or the [`InMemoryAttemptRepository`] shipped here.

pub mod adapter;
pub mod attempt;
pub mod memory;

pub use adapter::AttemptRepositoryAdapter;
pub use attempt::AttemptRepository;
pub use memory::{InMemoryAttemptRepository, InMemoryRepositoryProvider};

use async_trait::async_trait;

use crate::Error;

/// Provider trait for attempt repository access.
pub trait AttemptRepositoryProvider: Send + Sync + 'static {
    /// The attempt repository implementation type
    type AttemptRepo: AttemptRepository;

    /// Get the attempt repository
    fn attempts(&self) -> &Self::AttemptRepo;
}

/// Provider trait that storage implementations must implement.
///
/// # Example
///
/// ```rust,ignore
/// use fail2ban_core::repositories::*;
///
/// struct MyStorage { attempts: MyAttemptRepository }
///
/// impl AttemptRepositoryProvider for MyStorage {
///     type AttemptRepo = MyAttemptRepository;
///     fn attempts(&self) -> &Self::AttemptRepo { &self.attempts }
/// }
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn uninstall(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider: AttemptRepositoryProvider {
    /// Create or upgrade the attempt log schema
    async fn migrate(&self) -> Result<(), Error>;

    /// Remove the attempt log schema and everything in it
    async fn uninstall(&self) -> Result<(), Error>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> Result<(), Error>;
}
