// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use async_trait::async_trait;
use rlock_core::store::{SortedTransaction, Store, StoreError, TransactionOutcome};
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Wrapper that adds tracing to any Store
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[async_trait]
impl<S: Store> Store for TracedStore<S> {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.set_if_absent", key, ttl_ms = ttl.as_millis() as u64);
        async {
            let start = Instant::now();
            let result = self.inner.set_if_absent(key, value, ttl).await;
            match &result {
                Ok(true) => tracing::debug!(elapsed_ms = elapsed_ms(start), "key set"),
                Ok(false) => tracing::debug!(elapsed_ms = elapsed_ms(start), "key already set"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed_ms(start),
                    error = %e,
                    "set_if_absent failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.delete_if_equals", key);
        async {
            let start = Instant::now();
            let result = self.inner.delete_if_equals(key, expected).await;
            match &result {
                Ok(true) => tracing::debug!(elapsed_ms = elapsed_ms(start), "key deleted"),
                Ok(false) => tracing::debug!(
                    elapsed_ms = elapsed_ms(start),
                    "value did not match, key kept"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed_ms(start),
                    error = %e,
                    "delete_if_equals failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn sorted_score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        let span = tracing::info_span!("store.sorted_score", key, member);
        async {
            let result = self.inner.sorted_score(key, member).await;
            match &result {
                Ok(score) => tracing::trace!(?score, "score read"),
                Err(e) => tracing::error!(error = %e, "sorted_score failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn sorted_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.sorted_remove", key, member);
        async {
            let start = Instant::now();
            let result = self.inner.sorted_remove(key, member).await;
            match &result {
                Ok(true) => tracing::debug!(elapsed_ms = elapsed_ms(start), "member removed"),
                Ok(false) => tracing::debug!(elapsed_ms = elapsed_ms(start), "member absent"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed_ms(start),
                    error = %e,
                    "sorted_remove failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, tx: SortedTransaction) -> Result<TransactionOutcome, StoreError> {
        let span = tracing::info_span!(
            "store.execute",
            key = %tx.key,
            preconditions = tx.preconditions.len(),
            ops = tx.ops.len()
        );
        async {
            let start = Instant::now();
            let result = self.inner.execute(tx).await;
            match &result {
                Ok(TransactionOutcome::Committed(replies)) => tracing::debug!(
                    elapsed_ms = elapsed_ms(start),
                    replies = replies.len(),
                    "transaction committed"
                ),
                Ok(TransactionOutcome::Aborted) => tracing::debug!(
                    elapsed_ms = elapsed_ms(start),
                    "precondition failed, transaction aborted"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed_ms(start),
                    error = %e,
                    "transaction failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
