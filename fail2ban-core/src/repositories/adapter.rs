use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Attempt, AttemptKind, Error,
    repositories::{AttemptRepository, RepositoryProvider},
};

/// Adapter that wraps a RepositoryProvider and implements [`AttemptRepository`]
///
/// Services own an `Arc<impl AttemptRepository>`; the adapter lets them share a
/// provider with the rest of the application instead of taking the repository out
/// of it.
pub struct AttemptRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AttemptRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AttemptRepository for AttemptRepositoryAdapter<R> {
    async fn record(
        &self,
        identity: &str,
        kind: AttemptKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<Attempt, Error> {
        self.provider
            .attempts()
            .record(identity, kind, occurred_at)
            .await
    }

    async fn last_ban_time(&self, identity: &str) -> Result<Option<DateTime<Utc>>, Error> {
        self.provider.attempts().last_ban_time(identity).await
    }

    async fn eldest_of_last_n_failures(
        &self,
        identity: &str,
        n: u32,
    ) -> Result<Option<DateTime<Utc>>, Error> {
        self.provider
            .attempts()
            .eldest_of_last_n_failures(identity, n)
            .await
    }

    async fn count_failures_since(
        &self,
        identity: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<u32, Error> {
        self.provider
            .attempts()
            .count_failures_since(identity, since)
            .await
    }

    async fn history(&self, identity: &str, limit: u32) -> Result<Vec<Attempt>, Error> {
        self.provider.attempts().history(identity, limit).await
    }

    async fn purge_all(&self) -> Result<u64, Error> {
        self.provider.attempts().purge_all().await
    }
}
