// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counting semaphore over a shared sorted collection
//!
//! Holders are members of the collection at `key`, scored by the UTC
//! millisecond timestamp of their last acquire or refresh. Every acquire and
//! refresh transaction first purges members older than the lease, then trims
//! the collection to `size` members by keeping the lowest scores. Admitted
//! holders therefore keep their slots under contention and the newest
//! arrivals are the ones evicted.

use super::guard::{release_on_drop, SemaphorePermit};
use crate::clock::{Clock, SystemClock};
use crate::config::SemaphoreConfig;
use crate::error::{CoordinationError, PrimitiveKind, Resource};
use crate::id::{HolderId, IdGen, UuidIdGen};
use crate::retry::{poll, Acquired};
use crate::store::{OpReply, SortedTransaction, Store, StoreError, TransactionOutcome};
use std::future::Future;
use std::time::Duration;

/// Local view of a semaphore slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Held,
    Released,
    /// A refresh found the slot expired or evicted
    Lost,
}

/// One slot of a named semaphore
pub struct Semaphore<S: Store, C: Clock = SystemClock> {
    store: S,
    clock: C,
    config: SemaphoreConfig,
    identity: HolderId,
    state: SlotState,
}

impl<S: Store> Semaphore<S, SystemClock> {
    /// Create a slot request with a random identity
    pub fn new(store: S, config: SemaphoreConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: Store, C: Clock> Semaphore<S, C> {
    pub fn with_clock(store: S, config: SemaphoreConfig, clock: C) -> Self {
        Self {
            store,
            clock,
            config,
            identity: UuidIdGen.next(),
            state: SlotState::Free,
        }
    }

    pub fn with_identity(mut self, identity: HolderId) -> Self {
        self.identity = identity;
        self
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn identity(&self) -> &HolderId {
        &self.identity
    }

    pub fn config(&self) -> &SemaphoreConfig {
        &self.config
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.state == SlotState::Held
    }

    pub fn resource(&self) -> Resource {
        Resource {
            kind: PrimitiveKind::Semaphore,
            key: self.config.key.clone(),
            identity: self.identity.clone(),
            lease: self.config.lease,
            acquire_timeout: self.config.acquire_timeout,
            size: Some(self.config.size),
        }
    }

    /// Purge expired members, then trim to capacity
    fn housekeeping(&self, tx: SortedTransaction, now: f64) -> SortedTransaction {
        let expired_before = now - self.config.lease.as_millis() as f64;
        tx.remove_by_score(f64::NEG_INFINITY, expired_before)
            .remove_by_rank(i64::from(self.config.size), -1)
    }

    fn admission(&self, now: f64) -> SortedTransaction {
        let tx = SortedTransaction::new(self.config.key.as_str())
            .insert(self.identity.as_str(), now);
        self.housekeeping(tx, now).score(self.identity.as_str())
    }

    fn renewal(&self, now: f64) -> SortedTransaction {
        let tx = SortedTransaction::new(self.config.key.as_str())
            .require_member(self.identity.as_str());
        self.housekeeping(tx, now)
            .rescore(self.identity.as_str(), now)
            .score(self.identity.as_str())
    }

    /// Acquire within the configured timeout
    pub async fn acquire(&mut self) -> Result<Acquired, CoordinationError> {
        self.acquire_within(self.config.acquire_timeout).await
    }

    /// Retry the admission transaction until this identity survives the trim
    /// or `timeout` elapses. Each attempt uses a fresh timestamp. A size of
    /// zero or a zero lease is rejected up front.
    pub async fn acquire_within(
        &mut self,
        timeout: Duration,
    ) -> Result<Acquired, CoordinationError> {
        self.config.validate()?;
        let this = &*self;
        let result = poll(&this.config.retry, timeout, move || {
            let tx = this.admission(this.clock.epoch_millis() as f64);
            async move {
                let outcome = this.store.execute(tx).await?;
                Ok::<_, StoreError>(outcome.last_reply().and_then(OpReply::score).is_some())
            }
        })
        .await;

        match result {
            Ok(acquired) => {
                self.state = SlotState::Held;
                tracing::info!(
                    key = %self.config.key,
                    identity = %self.identity,
                    size = self.config.size,
                    attempts = acquired.attempts,
                    elapsed_ms = acquired.elapsed.as_millis() as u64,
                    "semaphore slot acquired"
                );
                Ok(acquired)
            }
            Err(exhausted) => {
                tracing::warn!(
                    key = %self.config.key,
                    identity = %self.identity,
                    size = self.config.size,
                    attempts = exhausted.attempts,
                    elapsed_ms = exhausted.elapsed.as_millis() as u64,
                    "semaphore acquire timed out"
                );
                Err(CoordinationError::AcquireTimeout {
                    resource: self.resource(),
                    waited: exhausted.elapsed,
                    attempts: exhausted.attempts,
                    last_error: exhausted.last_error,
                })
            }
        }
    }

    /// Remove this identity from the collection
    pub async fn release(&mut self) -> Result<(), CoordinationError> {
        let result = self
            .store
            .sorted_remove(&self.config.key, self.identity.as_str())
            .await;
        self.state = SlotState::Released;

        if result? {
            tracing::info!(
                key = %self.config.key,
                identity = %self.identity,
                "semaphore slot released"
            );
            Ok(())
        } else {
            tracing::warn!(
                key = %self.config.key,
                identity = %self.identity,
                "semaphore slot already expired or evicted"
            );
            Err(CoordinationError::ReleaseFailed {
                resource: self.resource(),
            })
        }
    }

    /// Renew the lease from now
    ///
    /// Runs purge and trim, then rewrites this identity's score to the
    /// current time. Fails if the identity was not a member when the
    /// transaction committed, or did not survive the purge and trim.
    pub async fn refresh(&mut self) -> Result<(), CoordinationError> {
        let now = self.clock.epoch_millis() as f64;
        let outcome = self.store.execute(self.renewal(now)).await?;

        let renewed = match &outcome {
            TransactionOutcome::Committed(_) => {
                outcome.last_reply().and_then(OpReply::score).is_some()
            }
            TransactionOutcome::Aborted => false,
        };

        if renewed {
            tracing::debug!(
                key = %self.config.key,
                identity = %self.identity,
                "semaphore lease renewed"
            );
            Ok(())
        } else {
            self.state = SlotState::Lost;
            tracing::warn!(
                key = %self.config.key,
                identity = %self.identity,
                aborted = !outcome.is_committed(),
                "semaphore slot lost before refresh"
            );
            Err(CoordinationError::RefreshFailed {
                resource: self.resource(),
            })
        }
    }

    /// Acquire and hand the slot to a permit that releases on drop
    pub async fn permit(mut self) -> Result<SemaphorePermit<S, C>, CoordinationError> {
        let acquired = self.acquire().await?;
        Ok(SemaphorePermit::new(self, acquired))
    }

    /// Run `body` while holding a slot
    ///
    /// The slot is released when the body completes. A failed release is
    /// returned as the result, discarding the body's value.
    pub async fn scoped<T, F, Fut>(self, body: F) -> Result<T, CoordinationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let permit = self.permit().await?;
        let value = body().await;
        permit.release().await.inspect_err(|e| {
            tracing::error!(error = %e, "semaphore slot lost before scope exit");
        })?;
        Ok(value)
    }

    pub(crate) fn release_in_background(mut self) {
        if self.state != SlotState::Held {
            return;
        }
        let resource = self.resource();
        release_on_drop(resource, async move { self.release().await });
    }
}

#[cfg(test)]
#[path = "semaphore_tests.rs"]
mod tests;
