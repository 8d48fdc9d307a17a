//! Repository trait for the login attempt log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Attempt, AttemptKind, Error};

/// Append-only log of login attempts, scoped per identity.
///
/// Records are never updated. For a given identity they are ordered by
/// `occurred_at`, and records sharing a timestamp are ordered by insertion
/// (`Attempt::id`), since timestamp resolution may be coarse.
///
/// # Concurrency
///
/// Implementations must accept concurrent appends for the same identity without
/// dropping any of them. No ordering is required across identities.
#[async_trait]
pub trait AttemptRepository: Send + Sync + 'static {
    /// Append an attempt.
    ///
    /// # Arguments
    ///
    /// * `identity` - The login identifier that was attempted
    /// * `kind` - Whether this is a failed attempt or a ban marker
    /// * `occurred_at` - The clock reading of the decision that produced the record
    ///
    /// # Returns
    ///
    /// The stored `Attempt` with its assigned ID.
    async fn record(
        &self,
        identity: &str,
        kind: AttemptKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<Attempt, Error>;

    /// Timestamp of the most recent ban record for the identity.
    ///
    /// Returns the latest ban, not the first, so duplicate ban records written by
    /// racing requests never shorten a ban.
    async fn last_ban_time(&self, identity: &str) -> Result<Option<DateTime<Utc>>, Error>;

    /// Timestamp of the oldest record among the `n` most recent failures.
    ///
    /// Failures are ordered newest first (`occurred_at`, then insertion order) and
    /// the `n`-th one is returned. Ban records are ignored.
    ///
    /// # Returns
    ///
    /// `None` when the identity has fewer than `n` failures on record, or when
    /// `n` is zero.
    async fn eldest_of_last_n_failures(
        &self,
        identity: &str,
        n: u32,
    ) -> Result<Option<DateTime<Utc>>, Error>;

    /// Number of failures recorded strictly after `since`, or all of them when `since` is `None`.
    async fn count_failures_since(
        &self,
        identity: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<u32, Error>;

    /// The most recent records for the identity, newest first.
    async fn history(&self, identity: &str, limit: u32) -> Result<Vec<Attempt>, Error>;

    /// Delete every record. Only used on teardown.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    async fn purge_all(&self) -> Result<u64, Error>;
}
