//! Services built on top of the attempt repository
//!
//! - [`ThrottleService`] holds the ban decision logic
//! - [`LoginGuard`] wraps one login submission around an external credential check

pub mod guard;
pub mod throttle;

pub use guard::{BanEnforcer, CredentialVerifier, LoginGuard, NoopEnforcer};
pub use throttle::{
    BanStatus, Decision, LoginOutcome, RejectReason, ThrottleService, ThrottleState,
};
