// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed store
//!
//! Conditional set maps onto `SET NX PX`. Conditional delete and sorted
//! transactions run as Lua scripts, which Redis executes atomically.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use rlock_core::store::{
    OpReply, Precondition, SortedOp, SortedTransaction, Store, StoreError, TransactionOutcome,
};
use std::time::Duration;

const COMPARE_AND_DELETE: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
end
return 0
";

/// Interprets the argument list built by [`encode_transaction`]
const SORTED_TRANSACTION: &str = r"
local key = KEYS[1]
local i = 1
local preconditions = tonumber(ARGV[i])
i = i + 1
for _ = 1, preconditions do
  if not redis.call('ZSCORE', key, ARGV[i]) then
    return {'0'}
  end
  i = i + 1
end
local replies = {'1'}
local ops = tonumber(ARGV[i])
i = i + 1
for _ = 1, ops do
  local op = ARGV[i]
  if op == 'insert' then
    table.insert(replies, tostring(redis.call('ZADD', key, ARGV[i + 2], ARGV[i + 1])))
    i = i + 3
  elseif op == 'rescore' then
    table.insert(replies, tostring(redis.call('ZADD', key, 'XX', 'CH', ARGV[i + 2], ARGV[i + 1])))
    i = i + 3
  elseif op == 'rem_score' then
    table.insert(replies, tostring(redis.call('ZREMRANGEBYSCORE', key, ARGV[i + 1], ARGV[i + 2])))
    i = i + 3
  elseif op == 'rem_rank' then
    table.insert(replies, tostring(redis.call('ZREMRANGEBYRANK', key, ARGV[i + 1], ARGV[i + 2])))
    i = i + 3
  elseif op == 'score' then
    table.insert(replies, redis.call('ZSCORE', key, ARGV[i + 1]))
    i = i + 2
  else
    return redis.error_reply('unknown sorted op: ' .. tostring(op))
  end
end
return replies
";

fn backend(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn score_arg(score: f64) -> String {
    if score == f64::INFINITY {
        "+inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        score.to_string()
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Flatten a transaction into script arguments
pub(crate) fn encode_transaction(tx: &SortedTransaction) -> Vec<String> {
    let mut args = vec![tx.preconditions.len().to_string()];
    for precondition in &tx.preconditions {
        match precondition {
            Precondition::Contains { member } => args.push(member.clone()),
        }
    }

    args.push(tx.ops.len().to_string());
    for op in &tx.ops {
        match op {
            SortedOp::Insert { member, score } => {
                args.extend(["insert".to_string(), member.clone(), score_arg(*score)])
            }
            SortedOp::Rescore { member, score } => {
                args.extend(["rescore".to_string(), member.clone(), score_arg(*score)])
            }
            SortedOp::RemoveByScore { min, max } => {
                args.extend(["rem_score".to_string(), score_arg(*min), score_arg(*max)])
            }
            SortedOp::RemoveByRank { start, stop } => {
                args.extend(["rem_rank".to_string(), start.to_string(), stop.to_string()])
            }
            SortedOp::Score { member } => args.extend(["score".to_string(), member.clone()]),
        }
    }
    args
}

/// Map the script's reply back onto the transaction's operations
pub(crate) fn decode_replies(
    ops: &[SortedOp],
    raw: Vec<Option<String>>,
) -> Result<TransactionOutcome, StoreError> {
    let mut raw = raw.into_iter();
    match raw.next().flatten().as_deref() {
        Some("0") => return Ok(TransactionOutcome::Aborted),
        Some("1") => {}
        other => {
            return Err(StoreError::Protocol(format!(
                "unexpected transaction marker: {:?}",
                other
            )))
        }
    }

    let raw: Vec<Option<String>> = raw.collect();
    if raw.len() != ops.len() {
        return Err(StoreError::Protocol(format!(
            "expected {} replies, got {}",
            ops.len(),
            raw.len()
        )));
    }

    let replies = ops
        .iter()
        .zip(raw)
        .map(|(op, reply)| match (op, reply) {
            (SortedOp::Score { .. }, None) => Ok(OpReply::Score(None)),
            (SortedOp::Score { .. }, Some(score)) => score
                .parse::<f64>()
                .map(|s| OpReply::Score(Some(s)))
                .map_err(|_| StoreError::Protocol(format!("invalid score: {}", score))),
            (_, Some(count)) => count
                .parse::<u64>()
                .map(OpReply::Count)
                .map_err(|_| StoreError::Protocol(format!("invalid count: {}", count))),
            (_, None) => Err(StoreError::Protocol("missing count reply".to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TransactionOutcome::Committed(replies))
}

/// Store backed by a Redis server
///
/// The connection URL selects the logical database (`redis://host:6379/2`).
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    compare_and_delete: Script,
    sorted_transaction: Script,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(backend)?;
        let conn = ConnectionManager::new(client).await.map_err(backend)?;
        Ok(Self::with_connection(conn))
    }

    pub fn with_connection(conn: ConnectionManager) -> Self {
        Self {
            conn,
            compare_and_delete: Script::new(COMPARE_AND_DELETE),
            sorted_transaction: Script::new(SORTED_TRANSACTION),
        }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(reply.is_some())
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(deleted == 1)
    }

    async fn sorted_score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        let mut conn = self.conn.clone();
        let score: Option<f64> = redis::cmd("ZSCORE")
            .arg(key)
            .arg(member)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(score)
    }

    async fn sorted_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("ZREM")
            .arg(key)
            .arg(member)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(removed > 0)
    }

    async fn execute(&self, tx: SortedTransaction) -> Result<TransactionOutcome, StoreError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.sorted_transaction.prepare_invoke();
        invocation.key(&tx.key);
        for arg in encode_transaction(&tx) {
            invocation.arg(arg);
        }
        let raw: Vec<Option<String>> = invocation.invoke_async(&mut conn).await.map_err(backend)?;
        decode_replies(&tx.ops, raw)
    }
}

#[cfg(test)]
#[path = "redis_tests.rs"]
mod tests;
