//! Per-id mutation exclusion.

use crate::error::{SyncError, SyncResult};
use cdnmanager_types::EntryId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of ids with a mutation in flight.
#[derive(Clone, Default)]
pub struct IdLocks {
    in_flight: Arc<Mutex<HashSet<EntryId>>>,
}

impl IdLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id`, or fails with `MutationInFlight` if it is already claimed.
    pub fn try_acquire(&self, id: &EntryId) -> SyncResult<IdGuard> {
        if !lock_set(&self.in_flight).insert(id.clone()) {
            return Err(SyncError::MutationInFlight(id.clone()));
        }
        Ok(IdGuard {
            in_flight: Arc::clone(&self.in_flight),
            id: id.clone(),
        })
    }

    pub fn is_locked(&self, id: &EntryId) -> bool {
        lock_set(&self.in_flight).contains(id)
    }
}

/// Releases its id on drop.
pub struct IdGuard {
    in_flight: Arc<Mutex<HashSet<EntryId>>>,
    id: EntryId,
}

impl Drop for IdGuard {
    fn drop(&mut self) {
        lock_set(&self.in_flight).remove(&self.id);
    }
}

fn lock_set(set: &Mutex<HashSet<EntryId>>) -> MutexGuard<'_, HashSet<EntryId>> {
    set.lock().unwrap_or_else(|e| e.into_inner())
}
