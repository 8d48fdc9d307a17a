#![cfg(feature = "sqlite")]

use std::sync::Arc;

use chrono::Duration;
use fail2ban::{
    AttemptKind, Decision, Fail2Ban, Fail2BanBuilder, LoginOutcome, ManualClock, PolicySettings,
    RejectReason, SqliteRepositoryProvider, ThrottleState,
};

async fn setup(clock: Arc<ManualClock>) -> Fail2Ban<SqliteRepositoryProvider> {
    let _ = tracing_subscriber::fmt().try_init();

    Fail2BanBuilder::new()
        .with_sqlite("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite")
        .with_clock(clock)
        .apply_migrations(true)
        .build()
        .await
        .expect("Failed to build Fail2Ban")
}

#[tokio::test]
async fn test_ban_lifecycle() {
    let clock = Arc::new(ManualClock::at_timestamp(0));
    let fail2ban = setup(clock.clone()).await;
    let identity = "admin@example.com";

    assert_eq!(
        fail2ban.evaluate_login(identity, false).await.unwrap(),
        Decision::Rejected(RejectReason::InvalidCredentials)
    );

    clock.set_timestamp(100);
    assert_eq!(
        fail2ban.evaluate_login(identity, false).await.unwrap(),
        Decision::Rejected(RejectReason::InvalidCredentials)
    );

    clock.set_timestamp(200);
    assert_eq!(
        fail2ban.evaluate_login(identity, false).await.unwrap(),
        Decision::Rejected(RejectReason::NewlyBanned)
    );

    // The right password doesn't help while banned, and nothing is written
    clock.set_timestamp(300);
    let decision = fail2ban.evaluate_login(identity, true).await.unwrap();
    assert_eq!(decision, Decision::Rejected(RejectReason::AlreadyBanned));
    assert_eq!(decision.outcome(), LoginOutcome::Rejected);
    assert_eq!(fail2ban.history(identity, 10).await.unwrap().len(), 4);

    let status = fail2ban.status(identity).await.unwrap();
    assert_eq!(status.state, ThrottleState::Banned);
    assert_eq!(status.retry_after_seconds(), Some(1700));

    // Still banned exactly at the boundary
    clock.set_timestamp(2000);
    assert!(fail2ban.is_banned(identity).await.unwrap());

    clock.advance(Duration::seconds(1));
    assert!(!fail2ban.is_banned(identity).await.unwrap());
    assert_eq!(
        fail2ban.evaluate_login(identity, true).await.unwrap(),
        Decision::Accepted
    );
}

#[tokio::test]
async fn test_failures_spread_beyond_find_time_do_not_ban() {
    let clock = Arc::new(ManualClock::at_timestamp(0));
    let fail2ban = setup(clock.clone()).await;

    for t in [0, 400, 700] {
        clock.set_timestamp(t);
        let decision = fail2ban.evaluate_login("a@x.com", false).await.unwrap();
        assert_eq!(decision, Decision::Rejected(RejectReason::InvalidCredentials));
    }

    let status = fail2ban.status("a@x.com").await.unwrap();
    assert_eq!(status.state, ThrottleState::Accumulating);
    assert_eq!(status.failures, 3);
}

#[tokio::test]
async fn test_identities_are_independent() {
    let clock = Arc::new(ManualClock::at_timestamp(0));
    let fail2ban = setup(clock.clone()).await;

    for _ in 0..3 {
        fail2ban.evaluate_login("a@x.com", false).await.unwrap();
    }

    assert!(fail2ban.is_banned("a@x.com").await.unwrap());
    assert!(!fail2ban.is_banned("b@x.com").await.unwrap());
    assert_eq!(
        fail2ban.evaluate_login("b@x.com", true).await.unwrap(),
        Decision::Accepted
    );
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let clock = Arc::new(ManualClock::at_timestamp(0));
    let fail2ban = setup(clock.clone()).await;

    for t in [10, 20, 30] {
        clock.set_timestamp(t);
        fail2ban.evaluate_login("a@x.com", false).await.unwrap();
    }

    let history = fail2ban.history("a@x.com", 10).await.unwrap();
    let kinds: Vec<_> = history.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AttemptKind::Ban,
            AttemptKind::Failure,
            AttemptKind::Failure,
            AttemptKind::Failure
        ]
    );
    assert_eq!(history[0].occurred_at.timestamp(), 30);
    assert_eq!(history[3].occurred_at.timestamp(), 10);

    assert!(fail2ban.history("  ", 10).await.unwrap_err().is_validation_error());
}

#[tokio::test]
async fn test_policy_update_applies_to_next_decision() {
    let clock = Arc::new(ManualClock::at_timestamp(0));
    let fail2ban = setup(clock.clone()).await;

    let updated = fail2ban
        .update_policy(PolicySettings {
            max_retry: 1,
            find_time: 60,
            ban_time: 30,
        })
        .unwrap();
    assert_eq!(updated.max_retry(), 1);

    assert_eq!(
        fail2ban.evaluate_login("a@x.com", false).await.unwrap(),
        Decision::Rejected(RejectReason::NewlyBanned)
    );

    clock.set_timestamp(31);
    assert!(!fail2ban.is_banned("a@x.com").await.unwrap());
}

#[tokio::test]
async fn test_invalid_policy_update_keeps_current_policy() {
    let clock = Arc::new(ManualClock::at_timestamp(0));
    let fail2ban = setup(clock).await;
    let before = fail2ban.policy();

    let err = fail2ban
        .update_policy(PolicySettings {
            max_retry: 0,
            find_time: 600,
            ban_time: 1800,
        })
        .unwrap_err();
    assert!(err.is_configuration_error());

    let err = fail2ban
        .update_policy(PolicySettings {
            max_retry: 3,
            find_time: 600,
            ban_time: 0,
        })
        .unwrap_err();
    assert!(err.is_configuration_error());

    assert_eq!(fail2ban.policy(), before);
}

#[tokio::test]
async fn test_uninstall_removes_attempt_log() {
    let clock = Arc::new(ManualClock::at_timestamp(0));
    let fail2ban = setup(clock).await;

    for _ in 0..3 {
        fail2ban.evaluate_login("a@x.com", false).await.unwrap();
    }
    assert!(fail2ban.is_banned("a@x.com").await.unwrap());

    fail2ban.uninstall().await.expect("Failed to uninstall");
    assert!(fail2ban.is_banned("a@x.com").await.unwrap_err().is_storage_error());

    // A fresh install forgets the old ban
    fail2ban.migrate().await.expect("Failed to migrate");
    assert!(!fail2ban.is_banned("a@x.com").await.unwrap());
}
