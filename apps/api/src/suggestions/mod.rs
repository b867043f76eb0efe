// Per-tip suggestion requests.
// One manager per reviewed record. Managers are created on the first request
// for an existing record; past a fixed count the least recently used idle
// manager is dropped together with its outcomes.

pub mod handlers;
pub mod manager;
pub mod prompts;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::llm_client::AiGateway;
use crate::models::RecordId;

pub use manager::{SuggestionKey, SuggestionRequestManager, TipContext};

/// Managers kept before idle ones are evicted.
pub const MANAGERS_KEPT: usize = 256;

#[derive(Clone)]
pub struct SuggestionRegistry {
    ai: Arc<dyn AiGateway>,
    inner: Arc<Mutex<RegistryInner>>,
    cap: usize,
}

#[derive(Default)]
struct RegistryInner {
    managers: HashMap<RecordId, Arc<SuggestionRequestManager>>,
    /// Least recently used first.
    order: VecDeque<RecordId>,
}

impl RegistryInner {
    fn touch(&mut self, id: RecordId) {
        self.order.retain(|seen| *seen != id);
        self.order.push_back(id);
    }
}

impl SuggestionRegistry {
    pub fn new(ai: Arc<dyn AiGateway>) -> Self {
        Self::with_cap(ai, MANAGERS_KEPT)
    }

    pub fn with_cap(ai: Arc<dyn AiGateway>, cap: usize) -> Self {
        Self {
            ai,
            inner: Arc::new(Mutex::new(RegistryInner::default())),
            cap,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Suggestion registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// The manager for `id` if one was ever created. Never creates one.
    pub fn get(&self, id: RecordId) -> Option<Arc<SuggestionRequestManager>> {
        self.lock().managers.get(&id).cloned()
    }

    /// The manager for `id`, created on first use. Callers must have
    /// confirmed the record exists.
    pub fn for_record(&self, id: RecordId) -> Arc<SuggestionRequestManager> {
        let mut inner = self.lock();
        inner.touch(id);
        let manager = inner
            .managers
            .entry(id)
            .or_insert_with(|| Arc::new(SuggestionRequestManager::new(Arc::clone(&self.ai))))
            .clone();
        self.evict_idle(&mut inner, id);
        manager
    }

    /// Drops least recently used managers with nothing pending until the
    /// registry is back within its cap. `keep` is never dropped.
    fn evict_idle(&self, inner: &mut RegistryInner, keep: RecordId) {
        let mut excess = inner.managers.len().saturating_sub(self.cap);
        let mut skipped = VecDeque::new();
        while excess > 0 {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            let idle = oldest != keep
                && inner
                    .managers
                    .get(&oldest)
                    .map_or(true, |m| m.pending().is_none());
            if idle {
                debug!("Dropping suggestion manager for {oldest}");
                inner.managers.remove(&oldest);
                excess -= 1;
            } else {
                skipped.push_back(oldest);
            }
        }
        skipped.append(&mut inner.order);
        inner.order = skipped;
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().managers.len()
    }
}
