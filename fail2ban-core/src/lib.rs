//! Core functionality for the fail2ban project
//!
//! This crate contains the attempt-tracking and ban-decision engine that protects a
//! login endpoint from brute-force credential guessing.
//!
//! It includes the [`Attempt`] record and [`PolicyConfig`] tunables, the
//! [`AttemptRepository`] storage contract with an in-memory implementation, and the
//! services that sit on top of it:
//!
//! - [`ThrottleService`] decides whether an identity is banned or should become banned
//! - [`LoginGuard`] orchestrates a single login submission around an external
//!   [`CredentialVerifier`]
//!
//! Storage backends (see `fail2ban-storage-sqlite`) implement [`AttemptRepository`] and
//! [`RepositoryProvider`]; application code normally goes through the `fail2ban` crate.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fail2ban_core::{
//!     Clock, ManualClock, PolicyConfig, ThrottleService,
//!     repositories::InMemoryAttemptRepository,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), fail2ban_core::Error> {
//! let clock = Arc::new(ManualClock::at_timestamp(0));
//! let service = ThrottleService::new(
//!     Arc::new(InMemoryAttemptRepository::new()),
//!     Arc::new(PolicyConfig::default()),
//!     clock.clone(),
//! );
//!
//! let decision = service.evaluate_login("admin@example.com", clock.now(), false).await?;
//! assert!(decision.is_rejected());
//! # Ok(())
//! # }
//! ```
pub mod attempt;
pub mod clock;
pub mod config;
pub mod error;
pub mod repositories;
pub mod services;
pub mod validation;

pub use attempt::{Attempt, AttemptKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PolicyConfig, PolicySource, SettingDescription, SharedPolicy};
pub use error::Error;
pub use repositories::{AttemptRepository, AttemptRepositoryProvider, RepositoryProvider};
pub use services::{
    BanEnforcer, BanStatus, CredentialVerifier, Decision, LoginGuard, LoginOutcome,
    NoopEnforcer, RejectReason, ThrottleService, ThrottleState,
};
