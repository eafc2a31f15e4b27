//! # Stock Row Locks
//!
//! SQLite locks the whole database, not rows. Sale commits need per store
//! item exclusion so that two orders for the same ingredient are linearized
//! while orders for disjoint ingredients never wait on each other. This
//! table supplies it: one async mutex per store item id.
//!
//! ```text
//! commit A needs {Bun, Patty}        commit B needs {Patty, Cheese}
//!      │                                  │
//!      ├─ lock Bun    (id 10) ✓           ├─ lock Patty (id 11) ...waits
//!      ├─ lock Patty  (id 11) ✓           │
//!      │  ... unit of work ...            │
//!      └─ release                         ├─ lock Patty (id 11) ✓
//!                                         └─ lock Cheese (id 12) ✓
//! ```
//!
//! Locks are always taken in ascending id order, so no two holders can wait
//! on each other. Waiters on one id are served first-come first-served.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use larder_core::StoreItemId;

/// Lock acquisition ran past its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTimedOut {
    /// The id that was still being waited on.
    pub store_item_id: StoreItemId,
    pub waited: Duration,
}

/// Shared table of per store item locks.
#[derive(Debug, Default)]
pub struct RowLocks {
    slots: Mutex<HashMap<StoreItemId, Arc<AsyncMutex<()>>>>,
}

impl RowLocks {
    pub fn new() -> Self {
        RowLocks::default()
    }

    fn slot(&self, id: StoreItemId) -> Arc<AsyncMutex<()>> {
        // The map is only touched for lookups and inserts, so a poisoned
        // guard still holds a consistent map.
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(slots.entry(id).or_default())
    }

    /// Acquires every id's lock in ascending order, all within `timeout`.
    ///
    /// Duplicates are ignored. On timeout, locks already taken by this call
    /// are released before returning.
    pub async fn acquire(
        &self,
        ids: &[StoreItemId],
        timeout: Duration,
    ) -> Result<RowLockSet, LockTimedOut> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let started = Instant::now();
        let deadline = started + timeout;
        let mut guards = Vec::with_capacity(ids.len());

        for id in ids {
            let slot = self.slot(id);
            match timeout_at(deadline, slot.lock_owned()).await {
                Ok(guard) => guards.push((id, guard)),
                Err(_) => {
                    debug!(store_item_id = id, held = guards.len(), "Row lock timed out");
                    return Err(LockTimedOut {
                        store_item_id: id,
                        waited: started.elapsed(),
                    });
                }
            }
        }

        Ok(RowLockSet { guards })
    }

    /// Number of ids that have ever been locked.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Locks held by one caller. Dropping the set releases them all.
#[derive(Debug)]
pub struct RowLockSet {
    guards: Vec<(StoreItemId, OwnedMutexGuard<()>)>,
}

impl RowLockSet {
    /// Locked ids in acquisition (ascending) order.
    pub fn ids(&self) -> impl Iterator<Item = StoreItemId> + '_ {
        self.guards.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}
