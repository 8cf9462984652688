// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owning guards for held locks and semaphore slots
//!
//! Release is async, so it cannot run inside `Drop`. Callers release
//! explicitly and see any `ReleaseFailed`; a guard dropped while still held
//! (early return, `?`, panic) hands the release to the current tokio runtime
//! and logs the outcome.

use super::lock::Lock;
use super::semaphore::Semaphore;
use crate::clock::Clock;
use crate::error::{CoordinationError, Resource};
use crate::id::HolderId;
use crate::retry::Acquired;
use crate::store::Store;
use std::future::Future;

/// Run a pending release on the ambient runtime, logging any failure
pub(crate) fn release_on_drop<F>(resource: Resource, release: F)
where
    F: Future<Output = Result<(), CoordinationError>> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            tracing::debug!(%resource, "guard dropped while held, releasing");
            handle.spawn(async move {
                if let Err(e) = release.await {
                    tracing::error!(%resource, error = %e, "release on drop failed");
                }
            });
        }
        Err(_) => {
            tracing::warn!(%resource, "guard dropped outside a runtime, lease will lapse on expiry");
        }
    }
}

/// A held lock, released on drop
pub struct LockGuard<S: Store> {
    lock: Option<Lock<S>>,
    acquired: Acquired,
}

impl<S: Store> LockGuard<S> {
    pub(crate) fn new(lock: Lock<S>, acquired: Acquired) -> Self {
        Self {
            lock: Some(lock),
            acquired,
        }
    }

    pub fn acquired(&self) -> Acquired {
        self.acquired
    }

    pub fn key(&self) -> Option<&str> {
        self.lock.as_ref().map(Lock::key)
    }

    pub fn identity(&self) -> Option<&HolderId> {
        self.lock.as_ref().map(Lock::identity)
    }

    /// Release now, surfacing `ReleaseFailed` if the lease was lost
    pub async fn release(mut self) -> Result<(), CoordinationError> {
        match self.lock.take() {
            Some(mut lock) => lock.release().await,
            None => Ok(()),
        }
    }
}

impl<S: Store> Drop for LockGuard<S> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            lock.release_in_background();
        }
    }
}

/// A held semaphore slot, released on drop
pub struct SemaphorePermit<S: Store, C: Clock> {
    semaphore: Option<Semaphore<S, C>>,
    acquired: Acquired,
}

impl<S: Store, C: Clock> SemaphorePermit<S, C> {
    pub(crate) fn new(semaphore: Semaphore<S, C>, acquired: Acquired) -> Self {
        Self {
            semaphore: Some(semaphore),
            acquired,
        }
    }

    pub fn acquired(&self) -> Acquired {
        self.acquired
    }

    pub fn key(&self) -> Option<&str> {
        self.semaphore.as_ref().map(Semaphore::key)
    }

    pub fn identity(&self) -> Option<&HolderId> {
        self.semaphore.as_ref().map(Semaphore::identity)
    }

    /// Renew the slot's lease
    pub async fn refresh(&mut self) -> Result<(), CoordinationError> {
        match self.semaphore.as_mut() {
            Some(semaphore) => semaphore.refresh().await,
            None => Ok(()),
        }
    }

    /// Release now, surfacing `ReleaseFailed` if the slot was lost
    pub async fn release(mut self) -> Result<(), CoordinationError> {
        match self.semaphore.take() {
            Some(mut semaphore) => semaphore.release().await,
            None => Ok(()),
        }
    }
}

impl<S: Store, C: Clock> Drop for SemaphorePermit<S, C> {
    fn drop(&mut self) {
        if let Some(semaphore) = self.semaphore.take() {
            semaphore.release_in_background();
        }
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
