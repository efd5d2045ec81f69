//! Per-key async locks
//!
//! Availability and escrow checks are read-check-write sequences over the
//! store. Holding the lock for a room (or a booking) across the sequence
//! keeps two requests from both passing the check.
//!
//! Entries live only while some task holds or waits on them.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Held lock on one key; releasing it forgets the key when nobody waits
pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Every holder and waiter owns a clone, so a count of one is the map alone
        self.locks
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: Uuid) -> KeyGuard<'_> {
        // Clone the Arc out so the DashMap shard is not held across the await
        let lock = Arc::clone(
            self.locks
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        KeyGuard {
            locks: self,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
