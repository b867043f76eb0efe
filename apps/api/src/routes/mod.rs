pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::state::AppState;
use crate::suggestions::handlers as suggestions;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis workflow
        .route("/api/v1/analyses", post(analysis::handle_start_analysis))
        .route(
            "/api/v1/analyses/:id/status",
            get(analysis::handle_analysis_status),
        )
        // Review
        .route("/api/v1/resumes/:id", get(analysis::handle_get_review))
        .route(
            "/api/v1/resumes/:id/preview",
            get(analysis::handle_get_preview),
        )
        // Per-tip suggestions
        .route(
            "/api/v1/resumes/:id/suggestions",
            post(suggestions::handle_request_suggestion).get(suggestions::handle_list_suggestions),
        )
        .with_state(state)
}
