// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote store interface
//!
//! Locks and semaphores never coordinate locally. Every guarantee they give
//! rests on the atomicity of the operations below, which a backend must
//! execute as a single linearizable step.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from store operations
#[derive(Clone, Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected store reply: {0}")]
    Protocol(String),
}

/// Condition that must hold when a transaction commits
#[derive(Clone, Debug, PartialEq)]
pub enum Precondition {
    /// The collection contains the member
    Contains { member: String },
}

/// One operation against a sorted collection
#[derive(Clone, Debug, PartialEq)]
pub enum SortedOp {
    /// Insert the member, or overwrite its score
    Insert { member: String, score: f64 },
    /// Overwrite the member's score only if it is already present
    Rescore { member: String, score: f64 },
    /// Remove members whose score lies in `[min, max]`
    RemoveByScore { min: f64, max: f64 },
    /// Remove members ranked `start..=stop` in ascending score order.
    /// Negative ranks count back from the highest score (-1 is the last).
    RemoveByRank { start: i64, stop: i64 },
    /// Read the member's score
    Score { member: String },
}

/// Reply to a single [`SortedOp`]
#[derive(Clone, Debug, PartialEq)]
pub enum OpReply {
    /// Number of members added, updated or removed
    Count(u64),
    /// Score read back, `None` when the member is absent
    Score(Option<f64>),
}

impl OpReply {
    pub fn score(&self) -> Option<f64> {
        match self {
            OpReply::Score(score) => *score,
            OpReply::Count(_) => None,
        }
    }
}

/// Result of executing a [`SortedTransaction`]
#[derive(Clone, Debug, PartialEq)]
pub enum TransactionOutcome {
    /// All preconditions held; one reply per operation, in order
    Committed(Vec<OpReply>),
    /// A precondition failed and nothing was applied
    Aborted,
}

impl TransactionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, TransactionOutcome::Committed(_))
    }

    /// Reply of the last operation, if the transaction committed
    pub fn last_reply(&self) -> Option<&OpReply> {
        match self {
            TransactionOutcome::Committed(replies) => replies.last(),
            TransactionOutcome::Aborted => None,
        }
    }
}

/// Batch of sorted-collection operations committed atomically
#[derive(Clone, Debug, PartialEq)]
pub struct SortedTransaction {
    pub key: String,
    pub preconditions: Vec<Precondition>,
    pub ops: Vec<SortedOp>,
}

impl SortedTransaction {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            preconditions: Vec::new(),
            ops: Vec::new(),
        }
    }

    pub fn require_member(mut self, member: impl Into<String>) -> Self {
        self.preconditions.push(Precondition::Contains {
            member: member.into(),
        });
        self
    }

    pub fn insert(mut self, member: impl Into<String>, score: f64) -> Self {
        self.ops.push(SortedOp::Insert {
            member: member.into(),
            score,
        });
        self
    }

    pub fn rescore(mut self, member: impl Into<String>, score: f64) -> Self {
        self.ops.push(SortedOp::Rescore {
            member: member.into(),
            score,
        });
        self
    }

    pub fn remove_by_score(mut self, min: f64, max: f64) -> Self {
        self.ops.push(SortedOp::RemoveByScore { min, max });
        self
    }

    pub fn remove_by_rank(mut self, start: i64, stop: i64) -> Self {
        self.ops.push(SortedOp::RemoveByRank { start, stop });
        self
    }

    pub fn score(mut self, member: impl Into<String>) -> Self {
        self.ops.push(SortedOp::Score {
            member: member.into(),
        });
        self
    }
}

/// Shared key-value and sorted-collection store
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// Set `key` to `value` with expiry `ttl` iff `key` has no value
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
        -> Result<bool, StoreError>;

    /// Delete `key` iff its value equals `expected`
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    /// Score of `member` in the collection at `key`
    async fn sorted_score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError>;

    /// Remove `member` from the collection at `key`, reporting whether it existed
    async fn sorted_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Commit the transaction iff all its preconditions hold
    async fn execute(&self, tx: SortedTransaction) -> Result<TransactionOutcome, StoreError>;
}

/// Resolve an inclusive rank range against a collection of `len` members.
///
/// Returns the index range to remove, or `None` when the range is empty.
pub fn rank_window(len: usize, start: i64, stop: i64) -> Option<std::ops::RangeInclusive<usize>> {
    let len = i64::try_from(len).ok()?;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return None;
    }
    Some(usize::try_from(start).ok()?..=usize::try_from(stop).ok()?)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
