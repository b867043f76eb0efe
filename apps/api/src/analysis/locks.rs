use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::models::RecordId;

/// Per-record mutual exclusion for analysis runs. A token is held from
/// `PersistingInitial` until the run ends either way.
#[derive(Clone, Default)]
pub struct RunLocks {
    held: Arc<Mutex<HashSet<RecordId>>>,
}

#[must_use = "the lock is released when the token is dropped"]
pub struct RunToken {
    id: RecordId,
    held: Arc<Mutex<HashSet<RecordId>>>,
}

impl RunLocks {
    /// `None` if another run already holds `id`.
    pub fn try_acquire(&self, id: RecordId) -> Option<RunToken> {
        let mut held = lock(&self.held);
        if !held.insert(id) {
            return None;
        }
        Some(RunToken {
            id,
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_held(&self, id: RecordId) -> bool {
        lock(&self.held).contains(&id)
    }
}

impl Drop for RunToken {
    fn drop(&mut self) {
        lock(&self.held).remove(&self.id);
    }
}

fn lock(held: &Mutex<HashSet<RecordId>>) -> std::sync::MutexGuard<'_, HashSet<RecordId>> {
    match held.lock() {
        Ok(g) => g,
        Err(poisoned) => {
            warn!("Run lock registry was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
