// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rlock-core: cross-process locks and semaphores over a shared store
//!
//! This crate provides:
//! - A `Store` trait capturing the conditional and transactional operations
//!   coordination relies on, plus an in-process `MemoryStore`
//! - `Lock` and `Semaphore` with jittered, deadline-bounded acquisition
//! - Guards that release on every exit path
//! - Serde configuration with humantime durations

pub mod clock;
pub mod config;
pub mod coordination;
pub mod error;
pub mod id;
pub mod retry;
pub mod store;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, CoordinationConfig, LockConfig, RetryPolicy, SemaphoreConfig};
pub use coordination::{Lock, LockGuard, LockState, Semaphore, SemaphorePermit, SlotState};
pub use error::{CoordinationError, PrimitiveKind, Resource};
pub use id::{HolderId, IdGen, SequentialIdGen, UuidIdGen};
pub use retry::Acquired;
pub use store::{
    MemoryStore, OpReply, Precondition, SortedOp, SortedTransaction, Store, StoreError,
    TransactionOutcome,
};
