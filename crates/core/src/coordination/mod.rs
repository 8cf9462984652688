// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination primitives for cross-process resource management
//!
//! This module provides:
//! - **Lock** - Exclusive access through a conditional set with a lease
//! - **Semaphore** - Up to N holders tracked in a timestamped sorted collection
//! - **Guards** - Owning handles that release on drop

pub mod guard;
pub mod lock;
pub mod semaphore;

pub use guard::{LockGuard, SemaphorePermit};
pub use lock::{Lock, LockState};
pub use semaphore::{Semaphore, SlotState};
