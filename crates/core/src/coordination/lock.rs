// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutual-exclusion lock over a shared store
//!
//! The remote entry `key -> identity` is created with a conditional set and
//! expires after the lease, so an abandoned lock frees itself. Release is a
//! conditional delete: it only succeeds while the entry still carries this
//! instance's identity.

use super::guard::{release_on_drop, LockGuard};
use crate::config::LockConfig;
use crate::error::{CoordinationError, PrimitiveKind, Resource};
use crate::id::{HolderId, IdGen, UuidIdGen};
use crate::retry::{poll, Acquired};
use crate::store::Store;
use std::future::Future;
use std::time::Duration;

/// Local view of a lock instance
///
/// Expiry of a held lease is not observed locally; only the next acquirer
/// sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockState {
    Unacquired,
    Held,
    Released,
}

/// A named lock with a unique identity
pub struct Lock<S: Store> {
    store: S,
    config: LockConfig,
    identity: HolderId,
    state: LockState,
}

impl<S: Store> Lock<S> {
    /// Create an unacquired lock with a random identity
    pub fn new(store: S, config: LockConfig) -> Self {
        Self {
            store,
            config,
            identity: UuidIdGen.next(),
            state: LockState::Unacquired,
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

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.state == LockState::Held
    }

    pub fn resource(&self) -> Resource {
        Resource {
            kind: PrimitiveKind::Lock,
            key: self.config.key.clone(),
            identity: self.identity.clone(),
            lease: self.config.lease,
            acquire_timeout: self.config.acquire_timeout,
            size: None,
        }
    }

    /// Acquire within the configured timeout
    pub async fn acquire(&mut self) -> Result<Acquired, CoordinationError> {
        self.acquire_within(self.config.acquire_timeout).await
    }

    /// Poll the store until the key is set to this identity or `timeout` elapses
    ///
    /// A config that fails validation (zero lease) is rejected before the
    /// store is touched.
    pub async fn acquire_within(
        &mut self,
        timeout: Duration,
    ) -> Result<Acquired, CoordinationError> {
        self.config.validate()?;
        let store = &self.store;
        let key = self.config.key.as_str();
        let identity = self.identity.as_str();
        let lease = self.config.lease;

        let result = poll(&self.config.retry, timeout, || {
            store.set_if_absent(key, identity, lease)
        })
        .await;

        match result {
            Ok(acquired) => {
                self.state = LockState::Held;
                tracing::info!(
                    key = %self.config.key,
                    identity = %self.identity,
                    attempts = acquired.attempts,
                    elapsed_ms = acquired.elapsed.as_millis() as u64,
                    "lock acquired"
                );
                Ok(acquired)
            }
            Err(exhausted) => {
                tracing::warn!(
                    key = %self.config.key,
                    identity = %self.identity,
                    attempts = exhausted.attempts,
                    elapsed_ms = exhausted.elapsed.as_millis() as u64,
                    "lock acquire timed out"
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

    /// Delete the key iff it still holds this identity
    ///
    /// The instance counts as released whatever the outcome; release is never
    /// retried.
    pub async fn release(&mut self) -> Result<(), CoordinationError> {
        let result = self
            .store
            .delete_if_equals(&self.config.key, self.identity.as_str())
            .await;
        self.state = LockState::Released;

        if result? {
            tracing::info!(key = %self.config.key, identity = %self.identity, "lock released");
            Ok(())
        } else {
            tracing::warn!(
                key = %self.config.key,
                identity = %self.identity,
                "lock release found no matching owner"
            );
            Err(CoordinationError::ReleaseFailed {
                resource: self.resource(),
            })
        }
    }

    /// Acquire and hand ownership to a guard that releases on drop
    pub async fn lock(mut self) -> Result<LockGuard<S>, CoordinationError> {
        let acquired = self.acquire().await?;
        Ok(LockGuard::new(self, acquired))
    }

    /// Run `body` while holding the lock
    ///
    /// The lock is released when the body completes. A failed release is
    /// returned as the result, discarding the body's value.
    pub async fn scoped<T, F, Fut>(self, body: F) -> Result<T, CoordinationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.lock().await?;
        let value = body().await;
        guard.release().await.inspect_err(|e| {
            tracing::error!(error = %e, "lock lost before scope exit");
        })?;
        Ok(value)
    }

    pub(crate) fn release_in_background(mut self) {
        if self.state != LockState::Held {
            return;
        }
        let resource = self.resource();
        release_on_drop(resource, async move { self.release().await });
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
