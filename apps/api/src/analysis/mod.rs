// Resume analysis workflow.
// Implements: stage model, orchestrator, run progress, per-id run locks,
// and the read-side review view.
// All model calls go through the AiGateway trait; no direct HTTP here.

pub mod handlers;
pub mod locks;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod review;
pub mod stage;

pub use orchestrator::{AnalysisOrchestrator, AnalysisRequest};
pub use progress::RunBoard;
