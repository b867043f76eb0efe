//! Per-tip suggestion requests for one reviewed document.
//!
//! At most one request is pending across the whole manager; while it runs,
//! requests for any key are refused. Outcomes are kept per key and a new
//! request for a key discards the previous outcome as soon as it is pending.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::extraction::{extract, Extracted};
use crate::llm_client::{AiGateway, ChatMessage, ChatOptions, MessagePart};
use crate::models::{FeedbackCategory, StructuredSuggestion, Tip};
use crate::storage::ArtifactRef;
use crate::suggestions::prompts::build_suggestion_instructions;

const SUGGESTION_MAX_TOKENS: u32 = 1024;

/// Position of a tip within one category of one feedback document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SuggestionKey {
    pub category: FeedbackCategory,
    pub index: usize,
}

/// Absent keys have never been requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum SuggestionOutcome {
    Pending,
    Structured(StructuredSuggestion),
    RawText(String),
    Error(String),
}

/// What the model is told about the tip being expanded.
#[derive(Debug, Clone)]
pub struct TipContext {
    pub headline: String,
    pub explanation: String,
    pub source: Option<ArtifactRef>,
}

impl TipContext {
    pub fn from_tip(tip: &Tip, source: Option<ArtifactRef>) -> Self {
        Self {
            headline: tip.tip.clone(),
            explanation: tip.explanation.clone(),
            source,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SuggestionRejected {
    #[error("A suggestion is already being generated for {} tip {}", .pending.category.field(), .pending.index)]
    Busy { pending: SuggestionKey },
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionEntry {
    pub key: SuggestionKey,
    pub outcome: SuggestionOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SuggestionSnapshot {
    pub pending: Option<SuggestionKey>,
    pub outcomes: Vec<SuggestionEntry>,
}

#[derive(Default)]
struct Board {
    outcomes: HashMap<SuggestionKey, SuggestionOutcome>,
    pending: Option<SuggestionKey>,
}

pub struct SuggestionRequestManager {
    ai: Arc<dyn AiGateway>,
    board: Mutex<Board>,
}

impl SuggestionRequestManager {
    pub fn new(ai: Arc<dyn AiGateway>) -> Self {
        Self {
            ai,
            board: Mutex::new(Board::default()),
        }
    }

    fn board(&self) -> MutexGuard<'_, Board> {
        match self.board.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Suggestion board lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Claims the single pending slot for `key` and marks it pending,
    /// replacing any earlier outcome for that key.
    pub fn try_begin(
        self: &Arc<Self>,
        key: SuggestionKey,
    ) -> Result<PendingSuggestion, SuggestionRejected> {
        let mut board = self.board();
        if let Some(pending) = board.pending {
            return Err(SuggestionRejected::Busy { pending });
        }
        board.pending = Some(key);
        board.outcomes.insert(key, SuggestionOutcome::Pending);
        Ok(PendingSuggestion {
            manager: Arc::clone(self),
            key,
            settled: false,
        })
    }

    /// Begins and resolves a request in one call.
    pub async fn request(
        self: &Arc<Self>,
        key: SuggestionKey,
        tip: TipContext,
    ) -> Result<SuggestionOutcome, SuggestionRejected> {
        let pending = self.try_begin(key)?;
        Ok(pending.resolve(tip).await)
    }

    pub fn outcome(&self, key: SuggestionKey) -> Option<SuggestionOutcome> {
        self.board().outcomes.get(&key).cloned()
    }

    pub fn pending(&self) -> Option<SuggestionKey> {
        self.board().pending
    }

    pub fn snapshot(&self) -> SuggestionSnapshot {
        let board = self.board();
        let mut outcomes: Vec<SuggestionEntry> = board
            .outcomes
            .iter()
            .map(|(key, outcome)| SuggestionEntry {
                key: *key,
                outcome: outcome.clone(),
            })
            .collect();
        outcomes.sort_by_key(|e| e.key);
        SuggestionSnapshot {
            pending: board.pending,
            outcomes,
        }
    }

    async fn generate(&self, tip: &TipContext) -> SuggestionOutcome {
        let mut parts = Vec::with_capacity(2);
        if let Some(source) = &tip.source {
            parts.push(MessagePart::File(source.clone()));
        }
        parts.push(MessagePart::Text(build_suggestion_instructions(
            &tip.headline,
            &tip.explanation,
        )));
        let options = ChatOptions {
            max_tokens: SUGGESTION_MAX_TOKENS,
            ..ChatOptions::default()
        };

        match self.ai.complete(&[ChatMessage::user(parts)], &options).await {
            Ok(reply) => match extract::<StructuredSuggestion>(&reply.joined_text()) {
                Extracted::Structured(s) => SuggestionOutcome::Structured(s),
                Extracted::RawText(text) => SuggestionOutcome::RawText(text),
            },
            Err(e) => SuggestionOutcome::Error(format!("Failed to generate suggestion: {e}")),
        }
    }

    /// Writes the outcome and frees the pending slot under one lock.
    fn settle(&self, key: SuggestionKey, outcome: SuggestionOutcome) {
        let mut board = self.board();
        board.outcomes.insert(key, outcome);
        if board.pending == Some(key) {
            board.pending = None;
        }
    }
}

/// Holds the pending slot. Dropping it unresolved (e.g. a cancelled task)
/// frees the slot and records an error outcome.
#[must_use = "dropping the request frees the slot without generating anything"]
pub struct PendingSuggestion {
    manager: Arc<SuggestionRequestManager>,
    key: SuggestionKey,
    settled: bool,
}

impl PendingSuggestion {
    pub async fn resolve(mut self, tip: TipContext) -> SuggestionOutcome {
        let outcome = self.manager.generate(&tip).await;
        match &outcome {
            SuggestionOutcome::Error(msg) => warn!("Suggestion {:?} failed: {msg}", self.key),
            other => info!(
                "Suggestion {:?} settled as {}",
                self.key,
                match other {
                    SuggestionOutcome::Structured(_) => "structured",
                    _ => "raw text",
                }
            ),
        }
        self.manager.settle(self.key, outcome.clone());
        self.settled = true;
        outcome
    }
}

impl Drop for PendingSuggestion {
    fn drop(&mut self) {
        if !self.settled {
            self.manager.settle(
                self.key,
                SuggestionOutcome::Error("Suggestion request was cancelled".to_string()),
            );
        }
    }
}
