// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rlock_core::MemoryStore;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

#[test]
fn set_if_absent_logs_span_and_outcome() {
    let (logs, results) = with_tracing(|| async {
        let traced = TracedStore::new(MemoryStore::new());
        let first = traced
            .set_if_absent("res1", "a", Duration::from_secs(30))
            .await;
        let second = traced
            .set_if_absent("res1", "b", Duration::from_secs(30))
            .await;
        (first, second)
    });

    assert_eq!(results, (Ok(true), Ok(false)));
    assert!(logs.contains("store.set_if_absent"), "Logs:\n{}", logs);
    assert!(logs.contains("res1"), "Logs:\n{}", logs);
    assert!(logs.contains("ttl_ms=30000"), "Logs:\n{}", logs);
    assert!(logs.contains("key set"), "Logs:\n{}", logs);
    assert!(logs.contains("key already set"), "Logs:\n{}", logs);
    assert!(logs.contains("elapsed_ms"), "Logs:\n{}", logs);
}

#[test]
fn delete_mismatch_logs_kept_key() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedStore::new(MemoryStore::new());
        traced
            .set_if_absent("res1", "a", Duration::from_secs(30))
            .await
            .unwrap();
        traced.delete_if_equals("res1", "b").await
    });

    assert_eq!(result, Ok(false));
    assert!(logs.contains("store.delete_if_equals"), "Logs:\n{}", logs);
    assert!(logs.contains("value did not match"), "Logs:\n{}", logs);
}

#[test]
fn store_errors_log_at_error_level() {
    let (logs, result) = with_tracing(|| async {
        let store = MemoryStore::new();
        store.fail_next(1);
        TracedStore::new(store).sorted_remove("pool", "a").await
    });

    assert!(matches!(result, Err(StoreError::Unavailable(_))));
    assert!(logs.contains("ERROR"), "Logs:\n{}", logs);
    assert!(logs.contains("sorted_remove failed"), "Logs:\n{}", logs);
    assert!(logs.contains("injected failure"), "Logs:\n{}", logs);
}

#[test]
fn execute_logs_commit_and_abort() {
    let (logs, results) = with_tracing(|| async {
        let traced = TracedStore::new(MemoryStore::new());
        let committed = traced
            .execute(SortedTransaction::new("pool").insert("a", 1.0).score("a"))
            .await;
        let aborted = traced
            .execute(
                SortedTransaction::new("pool")
                    .require_member("ghost")
                    .rescore("ghost", 2.0),
            )
            .await;
        (committed, aborted)
    });

    assert!(results.0.unwrap().is_committed());
    assert_eq!(results.1, Ok(TransactionOutcome::Aborted));
    assert!(logs.contains("store.execute"), "Logs:\n{}", logs);
    assert!(logs.contains("ops=2"), "Logs:\n{}", logs);
    assert!(logs.contains("transaction committed"), "Logs:\n{}", logs);
    assert!(logs.contains("transaction aborted"), "Logs:\n{}", logs);
}

#[tokio::test]
async fn traced_store_delegates_to_inner() {
    let inner = MemoryStore::new();
    let traced = TracedStore::new(inner.clone());

    traced
        .execute(SortedTransaction::new("pool").insert("a", 5.0))
        .await
        .unwrap();

    assert_eq!(inner.members("pool"), vec![("a".to_string(), 5.0)]);
    assert_eq!(traced.sorted_score("pool", "a").await, Ok(Some(5.0)));
    assert_eq!(traced.inner().members("pool").len(), 1);
}
