//! Ban decision service.
//!
//! This module implements fail2ban-style protection for a login endpoint: failed
//! attempts are appended to a log, and an identity whose last `max_retry` failures
//! all fall within `find_time` of the current instant is banned for `ban_time`.
//!
//! # Features
//!
//! - Sliding bans: each ban expires `ban_time` after its own ban record
//! - Lazy expiry: no background task, the ban state is a function of elapsed time
//! - Policy snapshot per decision, so live policy changes never tear a decision
//! - Storage failures surface as errors, never as "not banned"
//!
//! # Example
//!
//! ```rust,ignore
//! use fail2ban_core::{Decision, ThrottleService};
//!
//! let service = ThrottleService::new(repository, policy, clock);
//!
//! match service.evaluate_login("admin@example.com", clock.now(), credentials_ok).await? {
//!     Decision::Accepted => { /* continue the login */ }
//!     Decision::Rejected(reason) => { /* refuse, and enforce if banned */ }
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    AttemptKind, Clock, Error, PolicyConfig, PolicySource,
    repositories::AttemptRepository,
    validation::validate_identity,
};

/// Why a submission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The identity was already serving a ban
    AlreadyBanned,
    /// This submission exhausted the retry budget and raised a ban
    NewlyBanned,
    /// Credentials were wrong and the identity is still within budget
    InvalidCredentials,
}

/// Result of evaluating one login submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "reason")]
pub enum Decision {
    Accepted,
    Rejected(RejectReason),
}

/// What a caller may safely tell the client.
///
/// Every rejection collapses to the same variant so that a banned identity cannot
/// be told apart from a wrong password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
    Accepted,
    Rejected,
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted)
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_accepted()
    }

    /// True when the caller should run its ban enforcement (e.g. end the session).
    pub fn is_ban(&self) -> bool {
        matches!(
            self,
            Decision::Rejected(RejectReason::AlreadyBanned | RejectReason::NewlyBanned)
        )
    }

    pub fn outcome(&self) -> LoginOutcome {
        match self {
            Decision::Accepted => LoginOutcome::Accepted,
            Decision::Rejected(_) => LoginOutcome::Rejected,
        }
    }
}

/// Per-identity throttle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleState {
    /// No failures since the last ban (or ever)
    Clear,
    /// Failures recorded, ban not (yet) raised
    Accumulating,
    /// A ban is in force
    Banned,
}

/// Snapshot of an identity's throttle state at `checked_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanStatus {
    pub identity: String,
    pub state: ThrottleState,
    /// Failures recorded after the last ban, or all of them if never banned
    pub failures: u32,
    pub last_ban_at: Option<DateTime<Utc>>,
    pub banned_until: Option<DateTime<Utc>>,
    pub checked_at: DateTime<Utc>,
}

impl BanStatus {
    pub fn is_banned(&self) -> bool {
        self.state == ThrottleState::Banned
    }

    /// Seconds left on the ban, rounded down, or `None` when not banned.
    pub fn retry_after_seconds(&self) -> Option<i64> {
        self.banned_until
            .map(|until| (until - self.checked_at).num_seconds().max(0))
    }
}

/// Service deciding whether identities are banned.
///
/// The service is stateless apart from its collaborators and is safe to share across
/// tasks. It never mutates history except by appending failure and ban records.
///
/// # Concurrency
///
/// Two concurrent failures for the same identity may both observe that a ban is due
/// and both append a ban record. This is benign: [`AttemptRepository::last_ban_time`]
/// takes the latest ban, so the observed expiry is unchanged.
pub struct ThrottleService<R: AttemptRepository> {
    repository: Arc<R>,
    policy: Arc<dyn PolicySource>,
    clock: Arc<dyn Clock>,
}

impl<R: AttemptRepository> ThrottleService<R> {
    /// Create a new ThrottleService.
    ///
    /// # Arguments
    ///
    /// * `repository` - The attempt log
    /// * `policy` - Where to read the current ban policy from
    /// * `clock` - Time source used by [`status`](Self::status) and the login guard
    pub fn new(repository: Arc<R>, policy: Arc<dyn PolicySource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            policy,
            clock,
        }
    }

    /// The policy in force right now.
    pub fn policy(&self) -> PolicyConfig {
        self.policy.current()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Check whether the identity is serving a ban at `now`.
    ///
    /// A ban is in force when the latest ban record is at most `ban_time` old.
    pub async fn is_currently_banned(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        validate_identity(identity)?;
        self.is_banned_with(identity, now, &self.policy.current())
            .await
    }

    /// [`is_currently_banned`](Self::is_currently_banned) against an explicit policy snapshot.
    pub async fn is_banned_with(
        &self,
        identity: &str,
        now: DateTime<Utc>,
        policy: &PolicyConfig,
    ) -> Result<bool, Error> {
        let last_ban = self.repository.last_ban_time(identity).await?;
        Ok(last_ban.is_some_and(|banned_at| now - banned_at <= policy.ban_time()))
    }

    /// Check whether the identity has exhausted its retry budget at `now`.
    ///
    /// True when the oldest of the last `max_retry` failures is within `find_time` of
    /// `now`. The window is measured from `now`, not from the latest failure.
    pub async fn should_ban(&self, identity: &str, now: DateTime<Utc>) -> Result<bool, Error> {
        validate_identity(identity)?;
        self.should_ban_with(identity, now, &self.policy.current())
            .await
    }

    /// [`should_ban`](Self::should_ban) against an explicit policy snapshot.
    pub async fn should_ban_with(
        &self,
        identity: &str,
        now: DateTime<Utc>,
        policy: &PolicyConfig,
    ) -> Result<bool, Error> {
        let eldest = self
            .repository
            .eldest_of_last_n_failures(identity, policy.max_retry())
            .await?;
        Ok(eldest.is_some_and(|eldest| now - eldest <= policy.find_time()))
    }

    /// Evaluate one login submission whose credentials were already checked.
    ///
    /// 1. A banned identity is rejected without any write.
    /// 2. Valid credentials are accepted without any write.
    /// 3. Otherwise a failure is recorded, and a ban is raised if the retry budget
    ///    is exhausted.
    pub async fn evaluate_login(
        &self,
        identity: &str,
        now: DateTime<Utc>,
        credentials_valid: bool,
    ) -> Result<Decision, Error> {
        validate_identity(identity)?;
        let policy = self.policy.current();

        if self.is_banned_with(identity, now, &policy).await? {
            tracing::debug!(identity = %identity, "Rejected login for banned identity");
            return Ok(Decision::Rejected(RejectReason::AlreadyBanned));
        }

        if credentials_valid {
            return Ok(Decision::Accepted);
        }

        self.record_failure_with(identity, now, &policy).await
    }

    /// Record a failed attempt and raise a ban if the retry budget is exhausted.
    ///
    /// Callers must have checked the ban state with the same `policy` snapshot.
    pub async fn record_failure_with(
        &self,
        identity: &str,
        now: DateTime<Utc>,
        policy: &PolicyConfig,
    ) -> Result<Decision, Error> {
        self.repository
            .record(identity, AttemptKind::Failure, now)
            .await?;

        if self.should_ban_with(identity, now, policy).await? {
            self.repository
                .record(identity, AttemptKind::Ban, now)
                .await?;
            tracing::warn!(
                identity = %identity,
                max_retry = policy.max_retry(),
                ban_time = policy.ban_time().num_seconds(),
                "Identity banned after repeated login failures"
            );
            return Ok(Decision::Rejected(RejectReason::NewlyBanned));
        }

        tracing::debug!(identity = %identity, "Recorded failed login attempt");
        Ok(Decision::Rejected(RejectReason::InvalidCredentials))
    }

    /// Get the current throttle state of an identity.
    pub async fn status(&self, identity: &str) -> Result<BanStatus, Error> {
        validate_identity(identity)?;
        let policy = self.policy.current();
        let now = self.clock.now();

        let last_ban_at = self.repository.last_ban_time(identity).await?;
        let failures = self
            .repository
            .count_failures_since(identity, last_ban_at)
            .await?;

        let banned_until = last_ban_at
            .filter(|banned_at| now - *banned_at <= policy.ban_time())
            .map(|banned_at| banned_at + policy.ban_time());

        let state = if banned_until.is_some() {
            ThrottleState::Banned
        } else if failures > 0 {
            ThrottleState::Accumulating
        } else {
            ThrottleState::Clear
        };

        Ok(BanStatus {
            identity: identity.to_string(),
            state,
            failures,
            last_ban_at,
            banned_until,
            checked_at: now,
        })
    }
}
