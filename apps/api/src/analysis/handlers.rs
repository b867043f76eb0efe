//! Axum route handlers for the analysis workflow.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::analysis::progress::{ProgressReporter, RunSnapshot};
use crate::analysis::AnalysisRequest;
use crate::analysis::review::{load_preview, load_review, ReviewView};
use crate::analysis::stage::{AnalysisStage, RunState};
use crate::errors::AppError;
use crate::models::{Document, RecordId};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AnalysisAccepted {
    pub id: RecordId,
    pub status: &'static str,
}

#[derive(Default)]
struct UploadForm {
    file: Option<Document>,
    company_name: String,
    job_title: String,
    job_description: String,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/pdf")
                    .to_string();
                let bytes = field.bytes().await?;
                form.file = Some(Document::new(file_name, content_type, bytes));
            }
            Some("company_name") => form.company_name = field.text().await?,
            Some("job_title") => form.job_title = field.text().await?,
            Some("job_description") => form.job_description = field.text().await?,
            _ => {}
        }
    }
    Ok(form)
}

/// POST /api/v1/analyses
///
/// Accepts the resume upload and job context, then runs the analysis in the
/// background. The returned id is both the run handle and the record id.
pub async fn handle_start_analysis(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AnalysisAccepted>), AppError> {
    let form = read_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    if file.is_empty() {
        return Err(AppError::Validation("file cannot be empty".to_string()));
    }

    let request = AnalysisRequest {
        id: RecordId::new(),
        file,
        company_name: form.company_name,
        job_title: form.job_title,
        job_description: form.job_description,
    };
    let id = request.id;
    state.runs.report(
        id,
        &RunState::Running {
            stage: AnalysisStage::Idle,
        },
    );

    let orchestrator = state.orchestrator.clone();
    let runs = state.runs.clone();
    tokio::spawn(async move {
        // Outcome is recorded on the run board.
        let _ = orchestrator.run(request, &runs).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalysisAccepted {
            id,
            status: AnalysisStage::Uploading.status_text(),
        }),
    ))
}

/// GET /api/v1/analyses/:id/status
pub async fn handle_analysis_status(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<RunSnapshot>, AppError> {
    state
        .runs
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No analysis run for {id}")))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_review(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<ReviewView>, AppError> {
    load_review(state.kv.as_ref(), state.artifacts.as_ref(), id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

/// GET /api/v1/resumes/:id/preview
pub async fn handle_get_preview(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = load_preview(state.kv.as_ref(), state.artifacts.as_ref(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Preview for {id} not available")))?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}
