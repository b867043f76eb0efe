use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::analysis::stage::RunState;
use crate::models::RecordId;

/// Receives every state transition of a run.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, id: RecordId, state: &RunState);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _id: RecordId, _state: &RunState) {}
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub id: RecordId,
    #[serde(flatten)]
    pub state: RunState,
    pub status: String,
    pub terminal: bool,
    pub updated_at: DateTime<Utc>,
}

/// Finished runs kept for the status route before the oldest are dropped.
pub const FINISHED_RUNS_KEPT: usize = 1024;

/// Latest state per record id, served by the status route.
///
/// Runs in flight are always kept. Finished runs are kept in finish order up
/// to a fixed count; past it the oldest finished run is forgotten.
#[derive(Clone)]
pub struct RunBoard {
    inner: Arc<RwLock<BoardInner>>,
    finished_cap: usize,
}

#[derive(Default)]
struct BoardInner {
    runs: HashMap<RecordId, RunSnapshot>,
    finished: VecDeque<RecordId>,
}

impl Default for RunBoard {
    fn default() -> Self {
        Self::with_finished_cap(FINISHED_RUNS_KEPT)
    }
}

impl RunBoard {
    pub fn with_finished_cap(finished_cap: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(BoardInner::default())),
            finished_cap,
        }
    }

    pub fn get(&self, id: RecordId) -> Option<RunSnapshot> {
        let guard = match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Run board lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.runs.get(&id).cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(g) => g.runs.len(),
            Err(poisoned) => poisoned.into_inner().runs.len(),
        }
    }
}

impl ProgressReporter for RunBoard {
    fn report(&self, id: RecordId, state: &RunState) {
        let snapshot = RunSnapshot {
            id,
            state: state.clone(),
            status: state.status_text(),
            terminal: state.is_terminal(),
            updated_at: Utc::now(),
        };
        let mut guard = match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Run board lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let inner = &mut *guard;

        // A rerun of a finished id is live again.
        inner.finished.retain(|finished| *finished != id);
        if snapshot.terminal {
            inner.finished.push_back(id);
        }
        inner.runs.insert(id, snapshot);

        while inner.finished.len() > self.finished_cap {
            if let Some(oldest) = inner.finished.pop_front() {
                debug!("Forgetting finished run {oldest}");
                inner.runs.remove(&oldest);
            }
        }
    }
}
