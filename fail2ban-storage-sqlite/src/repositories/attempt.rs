//! SQLite implementation of the attempt repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fail2ban_core::{
    Attempt, AttemptKind, Error,
    error::{DatabaseResultExt, StorageError},
    repositories::AttemptRepository,
};
use sqlx::SqlitePool;

/// SQLite repository for the attempt log.
///
/// Timestamps are stored as unix nanoseconds, the full precision of the clock, so
/// ban and window boundaries match the in-memory store exactly. Records with equal
/// timestamps are ordered by their `AUTOINCREMENT` id.
pub struct SqliteAttemptRepository {
    pool: SqlitePool,
}

impl SqliteAttemptRepository {
    /// Create a new SQLite attempt repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteAttempt {
    id: i64,
    identity: String,
    is_ban: bool,
    occurred_at: i64,
}

impl From<SqliteAttempt> for Attempt {
    fn from(row: SqliteAttempt) -> Self {
        Attempt {
            id: row.id,
            identity: row.identity,
            kind: AttemptKind::from_is_ban(row.is_ban),
            occurred_at: DateTime::from_timestamp_nanos(row.occurred_at),
        }
    }
}

/// Internal struct for the eldest-of-last-n query
#[derive(Debug, sqlx::FromRow)]
struct SqliteRecentFailures {
    count: i64,
    eldest: Option<i64>,
}

fn to_timestamp(at: DateTime<Utc>) -> Result<i64, Error> {
    at.timestamp_nanos_opt().ok_or_else(|| {
        tracing::error!(at = %at, "Timestamp out of storable range");
        Error::Storage(StorageError::Database(format!("Timestamp out of range: {at}")))
    })
}

#[async_trait]
impl AttemptRepository for SqliteAttemptRepository {
    async fn record(
        &self,
        identity: &str,
        kind: AttemptKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<Attempt, Error> {
        let row = sqlx::query_as::<_, SqliteAttempt>(
            r#"
            INSERT INTO fail2ban (identity, is_ban, occurred_at)
            VALUES (?, ?, ?)
            RETURNING id, identity, is_ban, occurred_at
            "#,
        )
        .bind(identity)
        .bind(kind.is_ban())
        .bind(to_timestamp(occurred_at)?)
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to record login attempt")?;

        Ok(row.into())
    }

    async fn last_ban_time(&self, identity: &str) -> Result<Option<DateTime<Utc>>, Error> {
        let latest: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(occurred_at) FROM fail2ban WHERE identity = ? AND is_ban = 1",
        )
        .bind(identity)
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to get last ban time")?;

        Ok(latest.map(DateTime::from_timestamp_nanos))
    }

    async fn eldest_of_last_n_failures(
        &self,
        identity: &str,
        n: u32,
    ) -> Result<Option<DateTime<Utc>>, Error> {
        if n == 0 {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, SqliteRecentFailures>(
            r#"
            SELECT
                COUNT(*) AS count,
                MIN(occurred_at) AS eldest
            FROM (
                SELECT occurred_at FROM fail2ban
                WHERE identity = ? AND is_ban = 0
                ORDER BY occurred_at DESC, id DESC
                LIMIT ?
            ) recent
            "#,
        )
        .bind(identity)
        .bind(i64::from(n))
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to get recent failures")?;

        if row.count < i64::from(n) {
            return Ok(None);
        }

        Ok(row.eldest.map(DateTime::from_timestamp_nanos))
    }

    async fn count_failures_since(
        &self,
        identity: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<u32, Error> {
        let since = since.map(to_timestamp).transpose()?;

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM fail2ban
            WHERE identity = ? AND is_ban = 0
            AND (? IS NULL OR occurred_at > ?)
            "#,
        )
        .bind(identity)
        .bind(since)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to count failures")?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn history(&self, identity: &str, limit: u32) -> Result<Vec<Attempt>, Error> {
        let rows = sqlx::query_as::<_, SqliteAttempt>(
            r#"
            SELECT id, identity, is_ban, occurred_at
            FROM fail2ban
            WHERE identity = ?
            ORDER BY occurred_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(identity)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_db_err("Failed to get attempt history")?;

        Ok(rows.into_iter().map(Attempt::from).collect())
    }

    async fn purge_all(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM fail2ban")
            .execute(&self.pool)
            .await
            .map_db_err("Failed to purge attempts")?;

        Ok(result.rows_affected())
    }
}
