//! In-memory attempt log.
//!
//! Useful for single-process deployments and tests. Records live in a
//! `DashMap` keyed by identity, so appends for different identities never contend
//! and appends for the same identity are serialized by the map's shard lock.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{
    Attempt, AttemptKind, Error,
    repositories::{AttemptRepository, AttemptRepositoryProvider, RepositoryProvider},
};

#[derive(Debug, Default)]
pub struct InMemoryAttemptRepository {
    attempts: DashMap<String, Vec<Attempt>>,
    next_id: AtomicI64,
}

impl InMemoryAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Up to `n` records for the identity accepted by `keep`, newest first.
    ///
    /// One pass over the log with a heap bounded at `n`; only the selected records
    /// are cloned.
    fn newest<F>(&self, identity: &str, n: usize, keep: F) -> Vec<Attempt>
    where
        F: Fn(&Attempt) -> bool,
    {
        let Some(records) = self.attempts.get(identity) else {
            return Vec::new();
        };
        if n == 0 {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(n.min(records.len()) + 1);
        for (index, attempt) in records.iter().enumerate() {
            if !keep(attempt) {
                continue;
            }
            heap.push(Reverse((attempt.occurred_at, attempt.id, index)));
            if heap.len() > n {
                heap.pop();
            }
        }

        // Ascending order of `Reverse` keys is descending (occurred_at, id)
        heap.into_sorted_vec()
            .into_iter()
            .map(|Reverse((_, _, index))| records[index].clone())
            .collect()
    }
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn record(
        &self,
        identity: &str,
        kind: AttemptKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<Attempt, Error> {
        let mut records = self.attempts.entry(identity.to_string()).or_default();
        // Assigned under the entry lock so ids follow push order per identity
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let attempt = Attempt {
            id,
            identity: identity.to_string(),
            kind,
            occurred_at,
        };
        records.push(attempt.clone());
        Ok(attempt)
    }

    async fn last_ban_time(&self, identity: &str) -> Result<Option<DateTime<Utc>>, Error> {
        Ok(self.attempts.get(identity).and_then(|records| {
            records
                .iter()
                .filter(|a| a.is_ban())
                .map(|a| a.occurred_at)
                .max()
        }))
    }

    async fn eldest_of_last_n_failures(
        &self,
        identity: &str,
        n: u32,
    ) -> Result<Option<DateTime<Utc>>, Error> {
        if n == 0 {
            return Ok(None);
        }

        let failures = self.newest(identity, n as usize, |a| !a.is_ban());

        if failures.len() < n as usize {
            return Ok(None);
        }

        Ok(failures.last().map(|a| a.occurred_at))
    }

    async fn count_failures_since(
        &self,
        identity: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<u32, Error> {
        let count = self.attempts.get(identity).map_or(0, |records| {
            records
                .iter()
                .filter(|a| !a.is_ban() && since.is_none_or(|since| a.occurred_at > since))
                .count()
        });
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn history(&self, identity: &str, limit: u32) -> Result<Vec<Attempt>, Error> {
        Ok(self.newest(identity, limit as usize, |_| true))
    }

    async fn purge_all(&self) -> Result<u64, Error> {
        let removed = self.attempts.iter().map(|records| records.len()).sum::<usize>();
        self.attempts.clear();
        Ok(removed as u64)
    }
}

/// Repository provider backed by [`InMemoryAttemptRepository`].
#[derive(Debug, Default)]
pub struct InMemoryRepositoryProvider {
    attempts: InMemoryAttemptRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttemptRepositoryProvider for InMemoryRepositoryProvider {
    type AttemptRepo = InMemoryAttemptRepository;

    fn attempts(&self) -> &Self::AttemptRepo {
        &self.attempts
    }
}

#[async_trait]
impl RepositoryProvider for InMemoryRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn uninstall(&self) -> Result<(), Error> {
        let removed = self.attempts.purge_all().await?;
        tracing::info!(removed, "Dropped in-memory attempt log");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}
