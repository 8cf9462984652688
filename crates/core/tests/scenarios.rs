// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

//! End-to-end lock and semaphore scenarios against the in-memory store

use rlock_core::{
    CoordinationError, FakeClock, HolderId, Lock, LockConfig, MemoryStore, Semaphore,
    SemaphoreConfig,
};
use std::time::{Duration, Instant};

#[tokio::test]
async fn second_locker_times_out_after_its_timeout() {
    let store = MemoryStore::new();
    let mut a = Lock::new(store.clone(), LockConfig::new("res1"));
    let mut b = Lock::new(store.clone(), LockConfig::new("res1"));
    a.acquire().await.unwrap();
    assert_eq!(a.config().lease, Duration::from_secs(30));

    let start = Instant::now();
    let err = b.acquire_within(Duration::from_secs(2)).await.unwrap_err();
    let waited = start.elapsed();

    assert!(err.is_timeout());
    assert!(waited >= Duration::from_secs(2));
    assert!(waited < Duration::from_secs(3), "waited {:?}", waited);
}

#[tokio::test]
async fn third_semaphore_holder_times_out() {
    let store = MemoryStore::new();
    let config = SemaphoreConfig::new("pool", 2);
    let mut a = Semaphore::new(store.clone(), config.clone());
    let mut b = Semaphore::new(store.clone(), config.clone());
    let mut c = Semaphore::new(store.clone(), config);
    a.acquire().await.unwrap();
    b.acquire().await.unwrap();

    let start = Instant::now();
    let err = c
        .acquire_within(Duration::from_millis(500))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert_eq!(store.members("pool").len(), 2);
}

#[tokio::test]
async fn abandoned_semaphore_slot_is_reclaimed() {
    let clock = FakeClock::new();
    let store = MemoryStore::with_clock(clock.clone());
    let config = SemaphoreConfig::new("pool", 1).with_lease(Duration::from_secs(10));
    let mut a = Semaphore::with_clock(store.clone(), config.clone(), clock.clone());
    let mut b = Semaphore::with_clock(store.clone(), config, clock.clone());
    a.acquire().await.unwrap();

    clock.advance(Duration::from_secs(10));
    let acquired = b.acquire().await.unwrap();

    assert_eq!(acquired.attempts, 1);
    let members: Vec<String> = store.members("pool").into_iter().map(|(m, _)| m).collect();
    assert_eq!(members, vec![b.identity().0.clone()]);
}

#[tokio::test]
async fn released_lock_is_taken_without_retry() {
    let store = MemoryStore::new();
    let mut a = Lock::new(store.clone(), LockConfig::new("res1"));
    let mut b = Lock::new(store.clone(), LockConfig::new("res1"));
    a.acquire().await.unwrap();

    a.release().await.unwrap();
    let acquired = b.acquire().await.unwrap();

    assert_eq!(acquired.attempts, 1);
    assert!(acquired.elapsed < Duration::from_millis(10));
}

#[tokio::test]
async fn third_party_release_is_rejected() {
    let store = MemoryStore::new();
    let mut a = Lock::new(store.clone(), LockConfig::new("res1"));
    let mut c = Lock::new(store.clone(), LockConfig::new("res1"))
        .with_identity(HolderId::new("third-party"));
    a.acquire().await.unwrap();

    let err = c.release().await.unwrap_err();

    match err {
        CoordinationError::ReleaseFailed { resource } => {
            assert_eq!(resource.key, "res1");
            assert_eq!(resource.identity, HolderId::new("third-party"));
        }
        other => panic!("expected release failure, got {other:?}"),
    }
    assert_eq!(store.value("res1"), Some(a.identity().0.clone()));
}
