// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for coordination primitives

use crate::config::ConfigError;
use crate::id::HolderId;
use crate::store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Which primitive an error originated from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    Lock,
    Semaphore,
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimitiveKind::Lock => write!(f, "lock"),
            PrimitiveKind::Semaphore => write!(f, "semaphore"),
        }
    }
}

/// Describes the lock or semaphore slot an error refers to
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    pub kind: PrimitiveKind,
    pub key: String,
    pub identity: HolderId,
    pub lease: Duration,
    pub acquire_timeout: Duration,
    /// Capacity, for semaphores
    pub size: Option<u32>,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(key: {}", self.kind, self.key)?;
        if let Some(size) = self.size {
            write!(f, ", size: {}", size)?;
        }
        write!(f, ", lease: {})", humantime::format_duration(self.lease))
    }
}

/// Format to millisecond precision
fn human(duration: &Duration) -> humantime::FormattedDuration {
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    humantime::format_duration(Duration::from_millis(millis))
}

/// Errors surfaced by locks and semaphores
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// Polling ran past its deadline without acquiring
    #[error("timed out acquiring {resource} after {attempts} attempts in {}", human(.waited))]
    AcquireTimeout {
        resource: Resource,
        waited: Duration,
        attempts: u32,
        /// Most recent store failure seen while polling, if any
        #[source]
        last_error: Option<StoreError>,
    },
    /// The conditional release found no matching ownership
    #[error("failed to release {resource}: not held by {}", .resource.identity)]
    ReleaseFailed { resource: Resource },
    /// The semaphore slot was gone when refreshed
    #[error("failed to refresh {resource}: slot no longer held by {}", .resource.identity)]
    RefreshFailed { resource: Resource },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// The primitive was asked to acquire with a config that cannot work
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CoordinationError {
    /// Resource the error refers to, absent for bare store and config failures
    pub fn resource(&self) -> Option<&Resource> {
        match self {
            CoordinationError::AcquireTimeout { resource, .. }
            | CoordinationError::ReleaseFailed { resource }
            | CoordinationError::RefreshFailed { resource } => Some(resource),
            CoordinationError::Store(_) | CoordinationError::Config(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CoordinationError::AcquireTimeout { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
