// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process store
//!
//! Implements the full store contract behind a single mutex, so it serves
//! both as the backend for tasks coordinating within one process and as the
//! store the test suites run against. Expiry follows the injected clock.

use super::{
    rank_window, OpReply, Precondition, SortedOp, SortedTransaction, Store, StoreError,
    TransactionOutcome,
};
use crate::clock::{Clock, SystemClock};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    strings: HashMap<String, Entry>,
    /// Members kept sorted by (score, member)
    sorted: HashMap<String, Vec<(String, f64)>>,
    fail_next: u32,
}

impl State {
    fn take_failure(&mut self) -> Result<(), StoreError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    fn live_value(&mut self, key: &str, now: Instant) -> Option<&str> {
        if self.strings.get(key).is_some_and(|e| e.expires_at <= now) {
            self.strings.remove(key);
        }
        self.strings.get(key).map(|e| e.value.as_str())
    }

    fn contains(&self, key: &str, member: &str) -> bool {
        self.sorted
            .get(key)
            .is_some_and(|members| members.iter().any(|(m, _)| m == member))
    }

    fn apply(&mut self, key: &str, op: &SortedOp) -> OpReply {
        let members = self.sorted.entry(key.to_string()).or_default();
        let reply = match op {
            SortedOp::Insert { member, score } => {
                let existed = remove_member(members, member).is_some();
                insert_sorted(members, member, *score);
                OpReply::Count(u64::from(!existed))
            }
            SortedOp::Rescore { member, score } => {
                match remove_member(members, member) {
                    Some(previous) => {
                        insert_sorted(members, member, *score);
                        OpReply::Count(u64::from(previous.total_cmp(score).is_ne()))
                    }
                    None => OpReply::Count(0),
                }
            }
            SortedOp::RemoveByScore { min, max } => {
                let before = members.len();
                members.retain(|(_, s)| *s < *min || *s > *max);
                OpReply::Count((before - members.len()) as u64)
            }
            SortedOp::RemoveByRank { start, stop } => match rank_window(members.len(), *start, *stop)
            {
                Some(window) => OpReply::Count(members.drain(window).count() as u64),
                None => OpReply::Count(0),
            },
            SortedOp::Score { member } => OpReply::Score(
                members
                    .iter()
                    .find(|(m, _)| m == member)
                    .map(|(_, score)| *score),
            ),
        };
        if members.is_empty() {
            self.sorted.remove(key);
        }
        reply
    }
}

fn remove_member(members: &mut Vec<(String, f64)>, member: &str) -> Option<f64> {
    let idx = members.iter().position(|(m, _)| m == member)?;
    Some(members.remove(idx).1)
}

fn insert_sorted(members: &mut Vec<(String, f64)>, member: &str, score: f64) {
    let idx = members.partition_point(|(m, s)| {
        s.total_cmp(&score)
            .then_with(|| m.as_str().cmp(member))
            .is_lt()
    });
    members.insert(idx, (member.to_string(), score));
}

/// In-memory store shared by clones
#[derive(Clone, Debug)]
pub struct MemoryStore<C: Clock = SystemClock> {
    state: Arc<Mutex<State>>,
    clock: C,
}

impl MemoryStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next `count` store calls fail with [`StoreError::Unavailable`]
    pub fn fail_next(&self, count: u32) {
        self.state().fail_next = count;
    }

    /// Current unexpired value at `key`
    pub fn value(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        self.state().live_value(key, now).map(str::to_string)
    }

    /// Members of the collection at `key`, in ascending score order
    pub fn members(&self, key: &str) -> Vec<(String, f64)> {
        self.state().sorted.get(key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl<C: Clock> Store for MemoryStore<C> {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut state = self.state();
        state.take_failure()?;
        if state.live_value(key, now).is_some() {
            return Ok(false);
        }
        state.strings.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut state = self.state();
        state.take_failure()?;
        if state.live_value(key, now) != Some(expected) {
            return Ok(false);
        }
        state.strings.remove(key);
        Ok(true)
    }

    async fn sorted_score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        let mut state = self.state();
        state.take_failure()?;
        Ok(state
            .sorted
            .get(key)
            .and_then(|members| members.iter().find(|(m, _)| m == member))
            .map(|(_, score)| *score))
    }

    async fn sorted_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut state = self.state();
        state.take_failure()?;
        let Some(members) = state.sorted.get_mut(key) else {
            return Ok(false);
        };
        let removed = remove_member(members, member).is_some();
        if members.is_empty() {
            state.sorted.remove(key);
        }
        Ok(removed)
    }

    async fn execute(&self, tx: SortedTransaction) -> Result<TransactionOutcome, StoreError> {
        let mut state = self.state();
        state.take_failure()?;
        let satisfied = tx.preconditions.iter().all(|p| match p {
            Precondition::Contains { member } => state.contains(&tx.key, member),
        });
        if !satisfied {
            return Ok(TransactionOutcome::Aborted);
        }
        let replies = tx.ops.iter().map(|op| state.apply(&tx.key, op)).collect();
        Ok(TransactionOutcome::Committed(replies))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
