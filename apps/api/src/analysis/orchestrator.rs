//! Analysis orchestrator: drives one document through every stage.
//!
//! Flow: upload source → convert to preview → upload preview → persist record
//!       (empty feedback) → invoke model → extract feedback → persist record.
//!
//! A failure is terminal for the run. Earlier stages are not rolled back, so a
//! record with empty feedback may remain after a late failure; re-running the
//! same id overwrites it.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use crate::analysis::locks::RunLocks;
use crate::analysis::progress::ProgressReporter;
use crate::analysis::prompts::{build_feedback_instructions, FEEDBACK_SYSTEM};
use crate::analysis::stage::{AnalysisStage, FailureKind, RunState, StageFailure};
use crate::convert::DocumentConverter;
use crate::extraction::{extract, Extracted};
use crate::llm_client::{AiGateway, ChatMessage, ChatOptions, MessagePart};
use crate::models::{AnalysisRecord, Document, FeedbackDocument, RecordId};
use crate::storage::kv::save_record;
use crate::storage::{ArtifactStore, KvStore};

const FEEDBACK_MAX_TOKENS: u32 = 4096;

/// Input to one run. `id` is allocated by the caller so progress can be
/// tracked before the record exists.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub id: RecordId,
    pub file: Document,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
}

pub struct AnalysisOrchestrator {
    artifacts: Arc<dyn ArtifactStore>,
    kv: Arc<dyn KvStore>,
    ai: Arc<dyn AiGateway>,
    converter: Arc<dyn DocumentConverter>,
    locks: RunLocks,
}

impl AnalysisOrchestrator {
    pub fn new(
        artifacts: Arc<dyn ArtifactStore>,
        kv: Arc<dyn KvStore>,
        ai: Arc<dyn AiGateway>,
        converter: Arc<dyn DocumentConverter>,
    ) -> Self {
        Self {
            artifacts,
            kv,
            ai,
            converter,
            locks: RunLocks::default(),
        }
    }

    #[cfg(test)]
    pub fn locks(&self) -> &RunLocks {
        &self.locks
    }

    /// Runs every stage in order. On success returns the record id; the
    /// feedback itself is read back from the key-value store by the viewer.
    pub async fn run(
        &self,
        request: AnalysisRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<RecordId, StageFailure> {
        let id = request.id;
        let span = info_span!("analysis", record_id = %id);

        let result = self.drive(request, progress).instrument(span).await;
        match &result {
            Ok(_) => {
                info!("Analysis {id} complete");
                progress.report(id, &RunState::Complete);
            }
            Err(failure) => {
                warn!("Analysis {id} stopped: {failure}");
                progress.report(id, &RunState::Failed(failure.clone()));
            }
        }
        result
    }

    async fn drive(
        &self,
        request: AnalysisRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<RecordId, StageFailure> {
        let AnalysisRequest {
            id,
            file,
            company_name,
            job_title,
            job_description,
        } = request;
        let enter = |stage: AnalysisStage| {
            info!("Analysis {id}: {}", stage.status_text());
            progress.report(id, &RunState::Running { stage });
        };

        // Stage 1: upload source
        enter(AnalysisStage::Uploading);
        let resume_path = self.artifacts.upload(&file).await.map_err(|e| {
            StageFailure::new(
                AnalysisStage::Uploading,
                FailureKind::Transport,
                format!("Upload failed: {e}"),
            )
        })?;

        // Stage 2: render preview. Converter wording is surfaced as-is.
        enter(AnalysisStage::ConvertingToImage);
        let image = self.converter.convert(&file).await.map_err(|e| {
            StageFailure::new(
                AnalysisStage::ConvertingToImage,
                FailureKind::Conversion,
                e.to_string(),
            )
        })?;

        // Stage 3: upload preview
        enter(AnalysisStage::UploadingImage);
        let image_path = self.artifacts.upload(&image).await.map_err(|e| {
            StageFailure::new(
                AnalysisStage::UploadingImage,
                FailureKind::Transport,
                format!("Failed to upload image: {e}"),
            )
        })?;

        // Stage 4: initial persist, under the per-id token
        enter(AnalysisStage::PersistingInitial);
        let _token = self.locks.try_acquire(id).ok_or_else(|| {
            StageFailure::new(
                AnalysisStage::PersistingInitial,
                FailureKind::Busy,
                format!("Another analysis for {id} is still running"),
            )
        })?;
        let mut record = AnalysisRecord {
            id,
            resume_path,
            image_path,
            company_name,
            job_title,
            job_description,
            feedback: None,
        };
        self.persist(AnalysisStage::PersistingInitial, &record)
            .await?;

        // Stage 5: ask the model
        enter(AnalysisStage::InvokingAi);
        let raw = self.invoke_model(&record).await?;

        // Stage 6: recover the document. No degraded display exists for bulk
        // feedback, so raw text fails the run.
        enter(AnalysisStage::ExtractingFeedback);
        let feedback = match extract::<FeedbackDocument>(&raw) {
            Extracted::Structured(doc) => doc,
            Extracted::RawText(text) => {
                return Err(StageFailure::new(
                    AnalysisStage::ExtractingFeedback,
                    FailureKind::Extraction,
                    text,
                ))
            }
        };
        info!(
            "Analysis {id}: overall score {}/100, ATS {}/100",
            feedback.overall_score, feedback.ats.score
        );

        // Stage 7: final persist
        enter(AnalysisStage::PersistingFinal);
        record.feedback = Some(feedback);
        self.persist(AnalysisStage::PersistingFinal, &record).await?;

        Ok(id)
    }

    async fn invoke_model(&self, record: &AnalysisRecord) -> Result<String, StageFailure> {
        let instructions = build_feedback_instructions(
            &record.company_name,
            &record.job_title,
            &record.job_description,
        );
        let messages = [ChatMessage::user(vec![
            MessagePart::File(record.resume_path.clone()),
            MessagePart::Text(instructions),
        ])];
        let options = ChatOptions {
            system: FEEDBACK_SYSTEM,
            max_tokens: FEEDBACK_MAX_TOKENS,
        };

        let reply = self.ai.complete(&messages, &options).await.map_err(|e| {
            StageFailure::new(
                AnalysisStage::InvokingAi,
                FailureKind::Transport,
                format!("Failed to analyze resume: {e}"),
            )
        })?;

        let text = reply.joined_text();
        if text.trim().is_empty() {
            return Err(StageFailure::new(
                AnalysisStage::InvokingAi,
                FailureKind::Transport,
                "Failed to analyze resume: empty reply",
            ));
        }
        Ok(text)
    }

    async fn persist(
        &self,
        stage: AnalysisStage,
        record: &AnalysisRecord,
    ) -> Result<(), StageFailure> {
        save_record(self.kv.as_ref(), record).await.map_err(|e| {
            StageFailure::new(stage, FailureKind::Persistence, format!("Failed to save record: {e}"))
        })
    }
}
