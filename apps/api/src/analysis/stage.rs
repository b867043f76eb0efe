//! The discrete steps of the analysis workflow.
//!
//! | Stage | Consumes | Produces | Fails when |
//! |---|---|---|---|
//! | `Uploading` | source file | source `ArtifactRef` | storage returns no reference |
//! | `ConvertingToImage` | source file | preview image | converter reports an error |
//! | `UploadingImage` | preview image | preview `ArtifactRef` | storage returns no reference |
//! | `PersistingInitial` | both refs + context | record with empty feedback | store rejects the write, or the id is busy |
//! | `InvokingAi` | source ref + instruction | raw reply text | gateway fails or the reply is empty |
//! | `ExtractingFeedback` | raw reply text | `FeedbackDocument` | no structure could be recovered |
//! | `PersistingFinal` | populated record | nothing | store rejects the write |

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Idle,
    Uploading,
    ConvertingToImage,
    UploadingImage,
    PersistingInitial,
    InvokingAi,
    ExtractingFeedback,
    PersistingFinal,
    Complete,
}

impl AnalysisStage {
    /// Execution order. A run never skips or revisits a stage.
    pub const ORDER: [AnalysisStage; 9] = [
        AnalysisStage::Idle,
        AnalysisStage::Uploading,
        AnalysisStage::ConvertingToImage,
        AnalysisStage::UploadingImage,
        AnalysisStage::PersistingInitial,
        AnalysisStage::InvokingAi,
        AnalysisStage::ExtractingFeedback,
        AnalysisStage::PersistingFinal,
        AnalysisStage::Complete,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnalysisStage::Idle => "idle",
            AnalysisStage::Uploading => "uploading",
            AnalysisStage::ConvertingToImage => "converting_to_image",
            AnalysisStage::UploadingImage => "uploading_image",
            AnalysisStage::PersistingInitial => "persisting_initial",
            AnalysisStage::InvokingAi => "invoking_ai",
            AnalysisStage::ExtractingFeedback => "extracting_feedback",
            AnalysisStage::PersistingFinal => "persisting_final",
            AnalysisStage::Complete => "complete",
        }
    }

    /// Progress line shown to the user while the stage runs.
    pub fn status_text(self) -> &'static str {
        match self {
            AnalysisStage::Idle => "Waiting to start...",
            AnalysisStage::Uploading => "Uploading file...",
            AnalysisStage::ConvertingToImage => "Converting to image...",
            AnalysisStage::UploadingImage => "Uploading image...",
            AnalysisStage::PersistingInitial => "Preparing the data...",
            AnalysisStage::InvokingAi => "Analyzing data...",
            AnalysisStage::ExtractingFeedback => "Reading feedback...",
            AnalysisStage::PersistingFinal => "Saving feedback...",
            AnalysisStage::Complete => "Analysis completed",
        }
    }

    pub fn next(self) -> Option<AnalysisStage> {
        let pos = Self::ORDER.iter().position(|s| *s == self)?;
        Self::ORDER.get(pos + 1).copied()
    }
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A gateway was unreachable or returned nothing.
    Transport,
    /// The source could not be turned into a preview.
    Conversion,
    /// The reply could not be coerced into a feedback document.
    Extraction,
    /// The key-value store rejected a write.
    Persistence,
    /// Another run holds the record id.
    Busy,
}

/// Terminal failure of one run, tagged with the stage it stopped at.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[error("{stage} failed: {reason}")]
pub struct StageFailure {
    pub stage: AnalysisStage,
    pub kind: FailureKind,
    pub reason: String,
}

impl StageFailure {
    pub fn new(stage: AnalysisStage, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            reason: reason.into(),
        }
    }

    pub fn status_text(&self) -> String {
        format!("Error: {}", self.reason)
    }
}

/// Observable state of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Running { stage: AnalysisStage },
    Complete,
    Failed(StageFailure),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Running { .. })
    }

    pub fn stage(&self) -> AnalysisStage {
        match self {
            RunState::Running { stage } => *stage,
            RunState::Complete => AnalysisStage::Complete,
            RunState::Failed(failure) => failure.stage,
        }
    }

    pub fn status_text(&self) -> String {
        match self {
            RunState::Running { stage } => stage.status_text().to_string(),
            RunState::Complete => AnalysisStage::Complete.status_text().to_string(),
            RunState::Failed(failure) => failure.status_text(),
        }
    }
}
