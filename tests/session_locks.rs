// tests/session_locks.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use crate::common::{with_timeout, TestResult};
use topoctl::session::{PartitionLocks, Session, SessionStore};
use topoctl::state::{AggregatedState, DeviceLifecycle};

#[test]
fn store_replaces_whole_records() {
    let store = SessionStore::new();
    assert!(store.is_empty());

    store.put(Session::new("A", "s-1"));
    let mut updated = Session::new("A", "s-2");
    updated.last_state = AggregatedState::Uniform(DeviceLifecycle::Ready);
    store.put(updated.clone());

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("A"), Some(updated));
    assert!(store.contains("A"));
    assert!(store.get("B").is_none());
}

#[test]
fn store_snapshot_is_sorted_and_detached() {
    let store = SessionStore::new();
    store.put(Session::new("c", "s-3"));
    store.put(Session::new("a", "s-1"));
    store.put(Session::new("b", "s-2"));

    let snapshot = store.snapshot();
    store.remove("a");

    let ids: Vec<&str> = snapshot.iter().map(|s| s.partition_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(store.len(), 2);
}

#[test]
fn removing_unknown_partition_is_harmless() {
    let store = SessionStore::new();
    assert!(store.remove("ghost").is_none());
}

#[tokio::test]
async fn lock_is_exclusive_per_partition() -> TestResult {
    let locks = PartitionLocks::new();

    let guard = locks.acquire("A").await;
    assert!(locks.try_acquire("A").is_none());
    assert!(locks.try_acquire("B").is_some());

    drop(guard);
    assert!(locks.try_acquire("A").is_some());
    Ok(())
}

#[tokio::test]
async fn waiters_are_served_in_arrival_order() -> TestResult {
    let locks = Arc::new(PartitionLocks::new());
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    let first = locks.acquire("A").await;
    let mut handles = Vec::new();
    for i in 0..4 {
        let locks = Arc::clone(&locks);
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            let _guard = locks.acquire("A").await;
            order.lock().unwrap().push(i);
        }));
        // Let the task queue up before spawning the next one.
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    drop(first);

    for handle in handles {
        with_timeout(handle).await?;
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn known_partitions_lists_every_lock() -> TestResult {
    let locks = PartitionLocks::new();
    drop(locks.acquire("zeta").await);
    drop(locks.acquire("alpha").await);
    let _held = locks.try_acquire("mid");

    assert_eq!(locks.known_partitions(), vec!["alpha", "mid", "zeta"]);
    Ok(())
}
