// src/session/locks.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

use crate::types::PartitionId;

/// Held for the whole duration of one partition-scoped operation.
pub type PartitionGuard = OwnedMutexGuard<()>;

/// One lock per partition id.
///
/// Locks are inserted lazily under a short std mutex and are never removed,
/// so a handle obtained here is never invalidated by a concurrent caller.
#[derive(Debug, Default)]
pub struct PartitionLocks {
    locks: Mutex<HashMap<PartitionId, Arc<AsyncMutex<()>>>>,
}

impl PartitionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<PartitionId, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, partition_id: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.map();
        if let Some(lock) = map.get(partition_id) {
            return Arc::clone(lock);
        }
        let lock = Arc::new(AsyncMutex::new(()));
        map.insert(partition_id.to_string(), Arc::clone(&lock));
        lock
    }

    /// Wait for exclusive access to `partition_id`.
    ///
    /// Waiters are served in FIFO order. Dropping the returned guard releases
    /// the partition, including on early return and cancellation.
    pub async fn acquire(&self, partition_id: &str) -> PartitionGuard {
        let lock = self.handle(partition_id);
        trace!(partition = %partition_id, "waiting for partition lock");
        lock.lock_owned().await
    }

    /// Non-blocking variant of [`acquire`](Self::acquire).
    pub fn try_acquire(&self, partition_id: &str) -> Option<PartitionGuard> {
        self.handle(partition_id).try_lock_owned().ok()
    }

    /// Every partition id a lock was ever created for, sorted.
    pub fn known_partitions(&self) -> Vec<PartitionId> {
        let mut ids: Vec<PartitionId> = self.map().keys().cloned().collect();
        ids.sort();
        ids
    }
}
