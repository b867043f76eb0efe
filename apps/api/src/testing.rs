//! Fixtures and scripted collaborators shared by unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::convert::{ConversionError, DocumentConverter};
use crate::llm_client::{AiGateway, AiReply, ChatMessage, ChatOptions, LlmError};
use crate::models::{AnalysisRecord, Document, FeedbackDocument, RecordId};
use crate::storage::ArtifactRef;

fn category_json(score: u64) -> Value {
    json!({
        "score": score,
        "tips": [
            {"type": "good", "tip": "Clear headings", "explanation": "Sections are easy to scan."},
            {"type": "improve", "tip": "Quantify impact", "explanation": "Add numbers to bullets."}
        ]
    })
}

pub fn sample_feedback_json() -> Value {
    json!({
        "overallScore": 72,
        "ATS": {"score": 80, "tips": [{"type": "improve", "tip": "Add keywords"}]},
        "toneAndStyle": category_json(65),
        "content": category_json(70),
        "structure": category_json(90),
        "skills": {"score": 55, "tips": []}
    })
}

pub fn sample_feedback() -> FeedbackDocument {
    serde_json::from_value(sample_feedback_json()).expect("fixture is a valid feedback document")
}

pub fn sample_record(feedback: Option<FeedbackDocument>) -> AnalysisRecord {
    AnalysisRecord {
        id: RecordId::new(),
        resume_path: ArtifactRef::new("uploads/1/resume.pdf"),
        image_path: ArtifactRef::new("uploads/2/resume.png"),
        company_name: "Acme".to_string(),
        job_title: "Backend Engineer".to_string(),
        job_description: "Rust services at scale".to_string(),
        feedback,
    }
}

pub fn sample_pdf() -> Document {
    Document::new("resume.pdf", "application/pdf", b"%PDF-1.4\n%fixture\n".to_vec())
}

/// AI gateway double: replies with a fixed text, or fails when no reply is set.
/// A gated instance holds each reply until the returned `Notify` is signalled
/// (one `notify_one` releases one call).
#[derive(Default)]
pub struct ScriptedAi {
    reply: Mutex<Option<String>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedAi {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Mutex::new(Some(text.into())),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn gated(text: impl Into<String>) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let ai = Self {
            reply: Mutex::new(Some(text.into())),
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (ai, gate)
    }

    pub fn set_reply(&self, text: impl Into<String>) {
        *self.reply.lock().unwrap() = Some(text.into());
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiGateway for ScriptedAi {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &ChatOptions,
    ) -> Result<AiReply, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let reply = self.reply.lock().unwrap().clone();
        reply.map(AiReply::text).ok_or(LlmError::EmptyContent)
    }
}

pub struct ScriptedConverter {
    succeed: bool,
}

impl ScriptedConverter {
    pub fn succeeding() -> Self {
        Self { succeed: true }
    }

    pub fn failing() -> Self {
        Self { succeed: false }
    }
}

#[async_trait]
impl DocumentConverter for ScriptedConverter {
    async fn convert(&self, file: &Document) -> Result<Document, ConversionError> {
        if !self.succeed {
            return Err(ConversionError::NoOutput);
        }
        Ok(Document::new(
            format!("{}.png", file.stem()),
            "image/png",
            b"\x89PNG\r\n\x1a\n".to_vec(),
        ))
    }
}
