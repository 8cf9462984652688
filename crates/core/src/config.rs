// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock, semaphore and retry configuration
//!
//! Durations are written in humantime form (`"30s"`, `"250ms"`) wherever
//! configuration is deserialized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LOCK_LEASE: Duration = Duration::from_secs(30);
pub const DEFAULT_SEMAPHORE_LEASE: Duration = Duration::from_secs(10);
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_MIN_RETRY_DELAY: Duration = Duration::from_millis(10);
pub const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Errors loading coordination configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Bounds of the random delay between acquire attempts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    #[serde(with = "humantime_serde")]
    pub min_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_RETRY_DELAY,
            max_delay: DEFAULT_MAX_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay > self.max_delay {
            return Err(ConfigError::Invalid {
                name: "retry".to_string(),
                reason: "min_delay exceeds max_delay".to_string(),
            });
        }
        Ok(())
    }
}

/// Lock configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Key of the protected resource
    pub key: String,
    /// Expiry applied to the remote entry
    #[serde(with = "humantime_serde", default = "default_lock_lease")]
    pub lease: Duration,
    /// How long `acquire` polls by default
    #[serde(with = "humantime_serde", default = "default_acquire_timeout")]
    pub acquire_timeout: Duration,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl LockConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            lease: DEFAULT_LOCK_LEASE,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lease.is_zero() {
            return Err(invalid(&self.key, "lease must be non-zero"));
        }
        self.retry.validate()
    }
}

/// Semaphore configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SemaphoreConfig {
    /// Key of the membership collection
    pub key: String,
    /// Maximum number of concurrent holders
    pub size: u32,
    /// Per-entry lease
    #[serde(with = "humantime_serde", default = "default_semaphore_lease")]
    pub lease: Duration,
    #[serde(with = "humantime_serde", default = "default_acquire_timeout")]
    pub acquire_timeout: Duration,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl SemaphoreConfig {
    pub fn new(key: impl Into<String>, size: u32) -> Self {
        Self {
            key: key.into(),
            size,
            lease: DEFAULT_SEMAPHORE_LEASE,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(invalid(&self.key, "size must be at least 1"));
        }
        if self.lease.is_zero() {
            return Err(invalid(&self.key, "lease must be non-zero"));
        }
        self.retry.validate()
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn default_lock_lease() -> Duration {
    DEFAULT_LOCK_LEASE
}

fn default_semaphore_lease() -> Duration {
    DEFAULT_SEMAPHORE_LEASE
}

fn default_acquire_timeout() -> Duration {
    DEFAULT_ACQUIRE_TIMEOUT
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LockTable {
    #[serde(default, with = "humantime_serde")]
    lease: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    acquire_timeout: Option<Duration>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SemaphoreTable {
    size: u32,
    #[serde(default, with = "humantime_serde")]
    lease: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    acquire_timeout: Option<Duration>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    retry: RetryPolicy,
    #[serde(default)]
    locks: BTreeMap<String, LockTable>,
    #[serde(default)]
    semaphores: BTreeMap<String, SemaphoreTable>,
}

/// Named locks and semaphores loaded from TOML
///
/// ```toml
/// [retry]
/// min_delay = "10ms"
/// max_delay = "50ms"
///
/// [locks.res1]
/// lease = "30s"
///
/// [semaphores.pool]
/// size = 2
/// lease = "10s"
/// ```
#[derive(Clone, Debug, Default)]
pub struct CoordinationConfig {
    locks: BTreeMap<String, LockConfig>,
    semaphores: BTreeMap<String, SemaphoreConfig>,
}

impl CoordinationConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.retry.validate()?;

        let mut locks = BTreeMap::new();
        for (key, table) in file.locks {
            let config = LockConfig {
                key: key.clone(),
                lease: table.lease.unwrap_or(DEFAULT_LOCK_LEASE),
                acquire_timeout: table.acquire_timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT),
                retry: file.retry.clone(),
            };
            config.validate()?;
            locks.insert(key, config);
        }

        let mut semaphores = BTreeMap::new();
        for (key, table) in file.semaphores {
            let config = SemaphoreConfig {
                key: key.clone(),
                size: table.size,
                lease: table.lease.unwrap_or(DEFAULT_SEMAPHORE_LEASE),
                acquire_timeout: table.acquire_timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT),
                retry: file.retry.clone(),
            };
            config.validate()?;
            semaphores.insert(key, config);
        }

        Ok(Self { locks, semaphores })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn lock(&self, key: &str) -> Option<&LockConfig> {
        self.locks.get(key)
    }

    pub fn semaphore(&self, key: &str) -> Option<&SemaphoreConfig> {
        self.semaphores.get(key)
    }

    pub fn locks(&self) -> impl Iterator<Item = &LockConfig> {
        self.locks.values()
    }

    pub fn semaphores(&self) -> impl Iterator<Item = &SemaphoreConfig> {
        self.semaphores.values()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
