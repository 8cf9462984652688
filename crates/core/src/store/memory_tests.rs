// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;

fn member_names(store: &MemoryStore<FakeClock>, key: &str) -> Vec<String> {
    store.members(key).into_iter().map(|(m, _)| m).collect()
}

#[tokio::test]
async fn set_if_absent_only_sets_once() {
    let store = MemoryStore::new();
    let ttl = Duration::from_secs(30);

    assert!(store.set_if_absent("res1", "a", ttl).await.unwrap());
    assert!(!store.set_if_absent("res1", "b", ttl).await.unwrap());
    assert_eq!(store.value("res1").as_deref(), Some("a"));
}

#[tokio::test]
async fn set_if_absent_succeeds_after_expiry() {
    let clock = FakeClock::new();
    let store = MemoryStore::with_clock(clock.clone());

    assert!(store
        .set_if_absent("res1", "a", Duration::from_secs(10))
        .await
        .unwrap());
    clock.advance(Duration::from_secs(10));
    assert_eq!(store.value("res1"), None);
    assert!(store
        .set_if_absent("res1", "b", Duration::from_secs(10))
        .await
        .unwrap());
    assert_eq!(store.value("res1").as_deref(), Some("b"));
}

#[tokio::test]
async fn delete_if_equals_checks_value() {
    let store = MemoryStore::new();
    store
        .set_if_absent("res1", "a", Duration::from_secs(30))
        .await
        .unwrap();

    assert!(!store.delete_if_equals("res1", "b").await.unwrap());
    assert_eq!(store.value("res1").as_deref(), Some("a"));
    assert!(store.delete_if_equals("res1", "a").await.unwrap());
    assert_eq!(store.value("res1"), None);
    assert!(!store.delete_if_equals("res1", "a").await.unwrap());
}

#[tokio::test]
async fn delete_if_equals_ignores_expired_value() {
    let clock = FakeClock::new();
    let store = MemoryStore::with_clock(clock.clone());
    store
        .set_if_absent("res1", "a", Duration::from_secs(1))
        .await
        .unwrap();
    clock.advance(Duration::from_secs(2));

    assert!(!store.delete_if_equals("res1", "a").await.unwrap());
}

#[tokio::test]
async fn members_are_ordered_by_score_then_name() {
    let store = MemoryStore::with_clock(FakeClock::new());
    let tx = SortedTransaction::new("pool")
        .insert("c", 2.0)
        .insert("b", 1.0)
        .insert("a", 2.0);
    store.execute(tx).await.unwrap();

    assert_eq!(member_names(&store, "pool"), vec!["b", "a", "c"]);
}

#[tokio::test]
async fn insert_overwrites_existing_score() {
    let store = MemoryStore::new();
    let outcome = store
        .execute(SortedTransaction::new("pool").insert("a", 1.0).insert("a", 5.0))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TransactionOutcome::Committed(vec![OpReply::Count(1), OpReply::Count(0)])
    );
    assert_eq!(store.sorted_score("pool", "a").await.unwrap(), Some(5.0));
}

#[tokio::test]
async fn rescore_skips_missing_member() {
    let store = MemoryStore::new();
    let outcome = store
        .execute(SortedTransaction::new("pool").rescore("ghost", 1.0).score("ghost"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TransactionOutcome::Committed(vec![OpReply::Count(0), OpReply::Score(None)])
    );
    assert!(store.members("pool").is_empty());
}

#[tokio::test]
async fn remove_by_score_is_inclusive() {
    let store = MemoryStore::with_clock(FakeClock::new());
    let tx = SortedTransaction::new("pool")
        .insert("old", 100.0)
        .insert("edge", 200.0)
        .insert("new", 300.0)
        .remove_by_score(f64::NEG_INFINITY, 200.0);
    let outcome = store.execute(tx).await.unwrap();

    assert_eq!(outcome.last_reply(), Some(&OpReply::Count(2)));
    assert_eq!(member_names(&store, "pool"), vec!["new"]);
}

#[tokio::test]
async fn remove_by_rank_trims_highest_scores() {
    let store = MemoryStore::with_clock(FakeClock::new());
    let tx = SortedTransaction::new("pool")
        .insert("first", 1.0)
        .insert("second", 2.0)
        .insert("third", 3.0)
        .remove_by_rank(2, -1)
        .score("third");
    let outcome = store.execute(tx).await.unwrap();

    assert_eq!(outcome.last_reply(), Some(&OpReply::Score(None)));
    assert_eq!(member_names(&store, "pool"), vec!["first", "second"]);
}

#[tokio::test]
async fn failed_precondition_applies_nothing() {
    let store = MemoryStore::new();
    let tx = SortedTransaction::new("pool")
        .require_member("missing")
        .insert("a", 1.0);

    assert_eq!(store.execute(tx).await.unwrap(), TransactionOutcome::Aborted);
    assert!(store.members("pool").is_empty());
}

#[tokio::test]
async fn sorted_remove_reports_existence() {
    let store = MemoryStore::new();
    store
        .execute(SortedTransaction::new("pool").insert("a", 1.0))
        .await
        .unwrap();

    assert!(store.sorted_remove("pool", "a").await.unwrap());
    assert!(!store.sorted_remove("pool", "a").await.unwrap());
    assert!(!store.sorted_remove("other", "a").await.unwrap());
}

#[tokio::test]
async fn injected_failures_are_consumed() {
    let store = MemoryStore::new();
    store.fail_next(2);

    let ttl = Duration::from_secs(1);
    assert!(matches!(
        store.set_if_absent("k", "v", ttl).await,
        Err(StoreError::Unavailable(_))
    ));
    assert!(store.sorted_score("pool", "a").await.is_err());
    assert!(store.set_if_absent("k", "v", ttl).await.unwrap());
}

#[tokio::test]
async fn clones_share_state() {
    let store = MemoryStore::new();
    let other = store.clone();
    store
        .set_if_absent("res1", "a", Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(other.value("res1").as_deref(), Some("a"));
}
