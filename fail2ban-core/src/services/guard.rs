//! Login submission guard.
//!
//! [`LoginGuard`] is the thin boundary between a login handler and the
//! [`ThrottleService`]. It validates the submission, refuses banned identities, runs
//! the host's [`CredentialVerifier`], records failures and hands bans to a
//! [`BanEnforcer`] (for example to terminate the session that tried to log in).
//!
//! # Example
//!
//! ```rust,ignore
//! let guard = LoginGuard::new(throttle, Arc::new(my_verifier))
//!     .with_enforcer(Arc::new(my_session_killer));
//!
//! match guard.submit(&form.email, &form.password).await?.outcome() {
//!     LoginOutcome::Accepted => start_session().await,
//!     LoginOutcome::Rejected => render_login_error(),
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    Error,
    repositories::AttemptRepository,
    services::throttle::{Decision, RejectReason, ThrottleService},
    validation::{validate_identity, validate_secret},
};

/// Host-supplied credential check. The engine never verifies credentials itself.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + 'static {
    async fn verify(&self, identity: &str, secret: &str) -> Result<bool, Error>;
}

/// Reaction to a ban, run by the guard whenever a submission is refused because
/// the identity is (or just became) banned.
#[async_trait]
pub trait BanEnforcer: Send + Sync + 'static {
    async fn enforce(&self, identity: &str, reason: RejectReason) -> Result<(), Error>;
}

/// Enforcer that does nothing beyond returning the decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnforcer;

#[async_trait]
impl BanEnforcer for NoopEnforcer {
    async fn enforce(&self, _identity: &str, _reason: RejectReason) -> Result<(), Error> {
        Ok(())
    }
}

pub struct LoginGuard<R: AttemptRepository, V: CredentialVerifier, E: BanEnforcer = NoopEnforcer> {
    throttle: Arc<ThrottleService<R>>,
    verifier: Arc<V>,
    enforcer: Arc<E>,
}

impl<R: AttemptRepository, V: CredentialVerifier> LoginGuard<R, V, NoopEnforcer> {
    pub fn new(throttle: Arc<ThrottleService<R>>, verifier: Arc<V>) -> Self {
        Self {
            throttle,
            verifier,
            enforcer: Arc::new(NoopEnforcer),
        }
    }
}

impl<R: AttemptRepository, V: CredentialVerifier, E: BanEnforcer> LoginGuard<R, V, E> {
    pub fn with_enforcer<E2: BanEnforcer>(self, enforcer: Arc<E2>) -> LoginGuard<R, V, E2> {
        LoginGuard {
            throttle: self.throttle,
            verifier: self.verifier,
            enforcer,
        }
    }

    pub fn throttle(&self) -> &Arc<ThrottleService<R>> {
        &self.throttle
    }

    /// Handle one login submission.
    ///
    /// The clock and the policy are read once, and that snapshot is used for every
    /// step of the submission. A banned identity still goes through the verifier
    /// (its answer is discarded) so that refusing it takes as long as refusing a
    /// wrong password.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` for an empty identity or secret, before any store access
    /// - `Error::Storage` when the attempt log can't be read or written
    /// - `Error::Verifier` / any error returned by the verifier or the enforcer
    pub async fn submit(&self, identity: &str, secret: &str) -> Result<Decision, Error> {
        validate_identity(identity)?;
        validate_secret(secret)?;

        let now = self.throttle.now();
        let policy = self.throttle.policy();

        let decision = if self.throttle.is_banned_with(identity, now, &policy).await? {
            let _ = self.verifier.verify(identity, secret).await;
            Decision::Rejected(RejectReason::AlreadyBanned)
        } else if self.verifier.verify(identity, secret).await? {
            Decision::Accepted
        } else {
            self.throttle
                .record_failure_with(identity, now, &policy)
                .await?
        };

        if let Decision::Rejected(
            reason @ (RejectReason::AlreadyBanned | RejectReason::NewlyBanned),
        ) = decision
        {
            tracing::info!(identity = %identity, reason = ?reason, "Enforcing ban");
            self.enforcer.enforce(identity, reason).await?;
        }

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AttemptKind, ManualClock, PolicyConfig,
        repositories::InMemoryAttemptRepository,
    };
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts one fixed password and counts calls
    struct FixedPassword {
        password: &'static str,
        calls: AtomicUsize,
    }

    impl FixedPassword {
        fn new(password: &'static str) -> Self {
            Self {
                password,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CredentialVerifier for FixedPassword {
        async fn verify(&self, _identity: &str, secret: &str) -> Result<bool, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(secret == self.password)
        }
    }

    struct BrokenVerifier;

    #[async_trait]
    impl CredentialVerifier for BrokenVerifier {
        async fn verify(&self, _identity: &str, _secret: &str) -> Result<bool, Error> {
            Err(Error::Verifier("directory offline".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingEnforcer {
        enforced: Mutex<Vec<(String, RejectReason)>>,
    }

    #[async_trait]
    impl BanEnforcer for RecordingEnforcer {
        async fn enforce(&self, identity: &str, reason: RejectReason) -> Result<(), Error> {
            self.enforced
                .lock()
                .unwrap()
                .push((identity.to_string(), reason));
            Ok(())
        }
    }

    struct Fixture {
        repo: Arc<InMemoryAttemptRepository>,
        clock: Arc<ManualClock>,
        verifier: Arc<FixedPassword>,
        enforcer: Arc<RecordingEnforcer>,
        guard: LoginGuard<InMemoryAttemptRepository, FixedPassword, RecordingEnforcer>,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryAttemptRepository::new());
        let clock = Arc::new(ManualClock::at_timestamp(0));
        let throttle = Arc::new(ThrottleService::new(
            repo.clone(),
            Arc::new(PolicyConfig::default()),
            clock.clone(),
        ));
        let verifier = Arc::new(FixedPassword::new("hunter2"));
        let enforcer = Arc::new(RecordingEnforcer::default());
        let guard = LoginGuard::new(throttle, verifier.clone()).with_enforcer(enforcer.clone());

        Fixture {
            repo,
            clock,
            verifier,
            enforcer,
            guard,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_correct_password_accepted_without_record() {
        let f = fixture();

        let decision = f.guard.submit("admin@example.com", "hunter2").await.unwrap();
        assert_eq!(decision, Decision::Accepted);
        assert!(f.repo.history("admin@example.com", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ban_flow_with_enforcement() {
        let f = fixture();

        for t in [0, 100] {
            f.clock.set_timestamp(t);
            let decision = f.guard.submit("admin@example.com", "wrong").await.unwrap();
            assert_eq!(decision, Decision::Rejected(RejectReason::InvalidCredentials));
        }

        f.clock.set_timestamp(200);
        let decision = f.guard.submit("admin@example.com", "wrong").await.unwrap();
        assert_eq!(decision, Decision::Rejected(RejectReason::NewlyBanned));

        f.clock.set_timestamp(2000);
        let decision = f.guard.submit("admin@example.com", "hunter2").await.unwrap();
        assert_eq!(decision, Decision::Rejected(RejectReason::AlreadyBanned));

        f.clock.set_timestamp(2001);
        let decision = f.guard.submit("admin@example.com", "hunter2").await.unwrap();
        assert_eq!(decision, Decision::Accepted);

        let enforced = f.enforcer.enforced.lock().unwrap().clone();
        assert_eq!(
            enforced,
            vec![
                ("admin@example.com".to_string(), RejectReason::NewlyBanned),
                ("admin@example.com".to_string(), RejectReason::AlreadyBanned),
            ]
        );
    }

    #[tokio::test]
    async fn test_banned_identity_still_runs_verifier() {
        let f = fixture();
        f.repo
            .record("admin@example.com", AttemptKind::Ban, at(0))
            .await
            .unwrap();

        let decision = f.guard.submit("admin@example.com", "wrong").await.unwrap();
        assert_eq!(decision, Decision::Rejected(RejectReason::AlreadyBanned));
        assert_eq!(f.verifier.calls.load(Ordering::SeqCst), 1);

        // No failure is recorded while banned
        let history = f.repo.history("admin@example.com", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_ban());
    }

    #[tokio::test]
    async fn test_missing_fields_rejected_before_verification() {
        let f = fixture();

        let err = f.guard.submit("", "hunter2").await.unwrap_err();
        assert!(err.is_validation_error());

        let err = f.guard.submit("admin@example.com", "").await.unwrap_err();
        assert!(err.is_validation_error());

        assert_eq!(f.verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_verifier_error_is_not_a_failed_attempt() {
        let repo = Arc::new(InMemoryAttemptRepository::new());
        let throttle = Arc::new(ThrottleService::new(
            repo.clone(),
            Arc::new(PolicyConfig::default()),
            Arc::new(ManualClock::at_timestamp(0)),
        ));
        let guard = LoginGuard::new(throttle, Arc::new(BrokenVerifier));

        let err = guard.submit("admin@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, Error::Verifier(_)));
        assert!(repo.history("admin@example.com", 10).await.unwrap().is_empty());
    }
}
