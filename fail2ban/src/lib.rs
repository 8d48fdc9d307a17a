//! # fail2ban
//!
//! fail2ban protects a login endpoint from brute-force credential guessing. Failed
//! logins are appended to an attempt log per identity; an identity whose last
//! `max_retry` failures all happened within `find_time` is banned for `ban_time`,
//! even if it later presents the right password.
//!
//! The crate is a thin layer over `fail2ban-core`: it wires a storage backend, a
//! live-updatable policy and a clock into a [`Fail2Ban`] instance. Credential checks
//! stay with the host application, through [`CredentialVerifier`].
//!
//! ## Storage Support
//!
//! - SQLite (`sqlite` feature, default)
//! - In-memory, for single-process deployments and tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use fail2ban::{Fail2BanBuilder, LoginOutcome, PolicyConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fail2ban = Fail2BanBuilder::new()
//!     .with_sqlite("sqlite://fail2ban.db")
//!     .await?
//!     .with_policy(PolicyConfig::new(5, 600, 3600)?)
//!     .apply_migrations(true)
//!     .build()
//!     .await?;
//!
//! let credentials_ok = false; // result of the host's own password check
//! let decision = fail2ban.evaluate_login("admin@example.com", credentials_ok).await?;
//! if decision.outcome() == LoginOutcome::Rejected {
//!     // answer exactly as for a wrong password
//! }
//! # Ok(())
//! # }
//! ```
pub mod builder;

use std::sync::Arc;

use fail2ban_core::repositories::{AttemptRepository, AttemptRepositoryAdapter};

pub use builder::{Fail2BanBuilder, Fail2BanBuilderError};

/// Re-export core types from fail2ban_core
pub use fail2ban_core::{
    Attempt, AttemptKind, BanEnforcer, BanStatus, Clock, CredentialVerifier, Decision, Error,
    LoginGuard, LoginOutcome, ManualClock, NoopEnforcer, PolicyConfig, PolicySource,
    RejectReason, SharedPolicy, SystemClock, ThrottleService, ThrottleState,
};

pub use fail2ban_core::config::PolicySettings;
pub use fail2ban_core::repositories::{InMemoryRepositoryProvider, RepositoryProvider};

/// Re-export storage backends
#[cfg(feature = "sqlite")]
pub use fail2ban_storage_sqlite::{SqliteRepositoryProvider, SqliteStorage};

/// Throttle service type used by [`Fail2Ban`] for a given provider.
pub type Throttle<R> = ThrottleService<AttemptRepositoryAdapter<R>>;

/// The main entry point that ties storage, policy and clock together.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use fail2ban::{Fail2Ban, InMemoryRepositoryProvider};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), fail2ban::Error> {
/// let fail2ban = Fail2Ban::new(Arc::new(InMemoryRepositoryProvider::new()));
/// let status = fail2ban.status("admin@example.com").await?;
/// assert!(!status.is_banned());
/// # Ok(())
/// # }
/// ```
pub struct Fail2Ban<R: RepositoryProvider> {
    repositories: Arc<R>,
    policy: SharedPolicy,
    throttle: Arc<Throttle<R>>,
}

impl<R: RepositoryProvider> Fail2Ban<R> {
    /// Create an instance with the default policy and the system clock.
    pub fn new(repositories: Arc<R>) -> Self {
        Self::from_parts(repositories, PolicyConfig::default(), Arc::new(SystemClock))
    }

    pub(crate) fn from_parts(
        repositories: Arc<R>,
        policy: PolicyConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let policy = SharedPolicy::new(policy);
        let throttle = Arc::new(ThrottleService::new(
            Arc::new(AttemptRepositoryAdapter::new(repositories.clone())),
            Arc::new(policy.clone()),
            clock,
        ));

        Self {
            repositories,
            policy,
            throttle,
        }
    }

    /// Create the attempt log schema.
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    /// Drop the attempt log schema and every recorded attempt.
    pub async fn uninstall(&self) -> Result<(), Error> {
        self.repositories.uninstall().await
    }

    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    pub fn repositories(&self) -> &Arc<R> {
        &self.repositories
    }

    pub fn throttle(&self) -> &Arc<Throttle<R>> {
        &self.throttle
    }

    /// The policy in force right now.
    pub fn policy(&self) -> PolicyConfig {
        self.policy.current()
    }

    /// Validate and apply new policy settings. Decisions already running keep their snapshot.
    pub fn update_policy(&self, settings: PolicySettings) -> Result<PolicyConfig, Error> {
        Ok(self.policy.update(settings)?)
    }

    /// Build a [`LoginGuard`] around the host's credential verifier.
    pub fn guard<V: CredentialVerifier>(
        &self,
        verifier: Arc<V>,
    ) -> LoginGuard<AttemptRepositoryAdapter<R>, V> {
        LoginGuard::new(self.throttle.clone(), verifier)
    }

    /// Evaluate a submission whose credentials the caller already checked, at the current time.
    pub async fn evaluate_login(
        &self,
        identity: &str,
        credentials_valid: bool,
    ) -> Result<Decision, Error> {
        self.throttle
            .evaluate_login(identity, self.throttle.now(), credentials_valid)
            .await
    }

    pub async fn is_banned(&self, identity: &str) -> Result<bool, Error> {
        self.throttle
            .is_currently_banned(identity, self.throttle.now())
            .await
    }

    pub async fn status(&self, identity: &str) -> Result<BanStatus, Error> {
        self.throttle.status(identity).await
    }

    /// Most recent attempts for the identity, newest first.
    pub async fn history(&self, identity: &str, limit: u32) -> Result<Vec<Attempt>, Error> {
        fail2ban_core::validation::validate_identity(identity)?;
        self.throttle.repository().history(identity, limit).await
    }
}
