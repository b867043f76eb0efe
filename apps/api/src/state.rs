use std::sync::Arc;

use crate::analysis::{AnalysisOrchestrator, RunBoard};
use crate::storage::{ArtifactStore, KvStore};
use crate::suggestions::SuggestionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn KvStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    /// Latest progress of every analysis run started by this process.
    pub runs: RunBoard,
    pub suggestions: SuggestionRegistry,
}
