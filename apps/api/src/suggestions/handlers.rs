//! Axum route handlers for per-tip suggestions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::{FeedbackCategory, RecordId, TipKind};
use crate::state::AppState;
use crate::storage::kv::load_record;
use crate::suggestions::manager::{SuggestionRejected, SuggestionSnapshot};
use crate::suggestions::{SuggestionKey, TipContext};

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub category: FeedbackCategory,
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct SuggestAccepted {
    pub key: SuggestionKey,
    pub status: &'static str,
}

impl From<SuggestionRejected> for AppError {
    fn from(e: SuggestionRejected) -> Self {
        AppError::Conflict(e.to_string())
    }
}

/// POST /api/v1/resumes/:id/suggestions
///
/// Starts generating a suggestion for one `improve` tip. Responds before the
/// model replies; poll the GET route for the outcome.
pub async fn handle_request_suggestion(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    Json(request): Json<SuggestRequest>,
) -> Result<(StatusCode, Json<SuggestAccepted>), AppError> {
    let record = load_record(state.kv.as_ref(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;
    let feedback = record.feedback.as_ref().ok_or_else(|| {
        AppError::UnprocessableEntity(format!("Feedback for {id} is not ready yet"))
    })?;
    if request.category == FeedbackCategory::Ats {
        return Err(AppError::UnprocessableEntity(
            "Suggestions are not offered for ATS tips".to_string(),
        ));
    }
    let tip = feedback.tip(request.category, request.index).ok_or_else(|| {
        AppError::NotFound(format!(
            "No tip {} in {}",
            request.index,
            request.category.field()
        ))
    })?;
    if tip.kind != TipKind::Improve {
        return Err(AppError::UnprocessableEntity(
            "Suggestions are only available for tips marked 'improve'".to_string(),
        ));
    }

    let key = SuggestionKey {
        category: request.category,
        index: request.index,
    };
    let context = TipContext::from_tip(tip, Some(record.resume_path.clone()));
    let pending = state.suggestions.for_record(id).try_begin(key)?;
    info!("Suggestion requested for {id} {key:?}");

    tokio::spawn(async move {
        pending.resolve(context).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SuggestAccepted {
            key,
            status: "pending",
        }),
    ))
}

/// GET /api/v1/resumes/:id/suggestions
///
/// Records nobody has requested a suggestion for yield an empty snapshot.
pub async fn handle_list_suggestions(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Json<SuggestionSnapshot> {
    let snapshot = state
        .suggestions
        .get(id)
        .map(|manager| manager.snapshot())
        .unwrap_or_default();
    Json(snapshot)
}
