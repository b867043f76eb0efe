/// LLM Client: the single point of entry for all Claude API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Analysis and suggestion code talk to the `AiGateway` trait; `LlmClient`
/// is its production implementation.
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::{ArtifactRef, ArtifactStore};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Hardcoded to prevent accidental drift between environments.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Gateway contract
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
        }
    }
}

/// One piece of a chat message. File parts reference stored artifacts and
/// are resolved by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePart {
    Text(String),
    File(ArtifactRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    pub fn user(parts: Vec<MessagePart>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub system: &'static str,
    pub max_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            system: prompts::JSON_ONLY_SYSTEM,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

/// Reply content is either a bare string or a sequence of typed parts.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReplyContent {
    Text(String),
    Parts(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiReply {
    pub content: ReplyContent,
}

impl AiReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: ReplyContent::Text(text.into()),
        }
    }

    /// Joins every text part with newlines; non-text parts are ignored.
    pub fn joined_text(&self) -> String {
        match &self.content {
            ReplyContent::Text(text) => text.clone(),
            ReplyContent::Parts(blocks) => blocks
                .iter()
                .filter(|b| b.block_type == "text")
                .filter_map(|b| b.text.as_deref())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string(),
        }
    }
}

#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<AiReply, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Serialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    block_type: &'static str,
    text: String,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry logic. File parts are inlined
/// as extracted text read back from artifact storage.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    artifacts: Arc<dyn ArtifactStore>,
}

impl LlmClient {
    pub fn new(api_key: String, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            artifacts,
        }
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn call(&self, request_body: &AnthropicRequest<'_>) -> Result<LlmResponse, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Turns message parts into Anthropic text blocks. An unreadable file is
    /// skipped so the instruction text still goes out.
    async fn resolve_parts(&self, parts: &[MessagePart]) -> Vec<AnthropicBlock> {
        let mut blocks = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                MessagePart::Text(text) => blocks.push(AnthropicBlock {
                    block_type: "text",
                    text: text.clone(),
                }),
                MessagePart::File(artifact) => match self.attachment_text(artifact).await {
                    Some(text) => blocks.push(AnthropicBlock {
                        block_type: "text",
                        text: format!("ATTACHED RESUME ({artifact}):\n{text}"),
                    }),
                    None => warn!("Skipping unreadable attachment {artifact}"),
                },
            }
        }
        blocks
    }

    async fn attachment_text(&self, artifact: &ArtifactRef) -> Option<String> {
        let bytes = match self.artifacts.read(artifact).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Attachment read failed: {e}");
                return None;
            }
        };
        // pdf-extract is CPU-bound
        let extracted =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;
        match extracted {
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                warn!("PDF text extraction failed for {artifact}: {e}");
                None
            }
            Err(e) => {
                warn!("PDF text extraction task failed for {artifact}: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl AiGateway for LlmClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<AiReply, LlmError> {
        let mut wire_messages = Vec::with_capacity(messages.len());
        for message in messages {
            wire_messages.push(AnthropicMessage {
                role: message.role.as_str(),
                content: self.resolve_parts(&message.parts).await,
            });
        }

        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: options.max_tokens,
            system: options.system,
            messages: wire_messages,
        };

        let response = self.call(&request_body).await?;
        if response.content.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(AiReply {
            content: ReplyContent::Parts(response.content),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryArtifactStore;

    fn block(kind: &str, text: Option<&str>) -> ContentBlock {
        ContentBlock {
            block_type: kind.to_string(),
            text: text.map(String::from),
        }
    }

    #[test]
    fn test_joined_text_single_string() {
        assert_eq!(AiReply::text("{\"a\":1}").joined_text(), "{\"a\":1}");
    }

    #[test]
    fn test_joined_text_skips_non_text_parts() {
        let reply = AiReply {
            content: ReplyContent::Parts(vec![
                block("text", Some("Here you go:")),
                block("tool_use", None),
                block("text", Some("{\"a\":1}\n")),
            ]),
        };
        assert_eq!(reply.joined_text(), "Here you go:\n{\"a\":1}");
    }

    #[test]
    fn test_reply_content_deserializes_both_shapes() {
        let single: AiReply = serde_json::from_str(r#"{"content": "hello"}"#).unwrap();
        assert_eq!(single.joined_text(), "hello");

        let parts: AiReply =
            serde_json::from_str(r#"{"content": [{"type": "text", "text": "hi"}]}"#).unwrap();
        assert_eq!(parts.joined_text(), "hi");
    }

    #[test]
    fn test_request_serializes_text_blocks() {
        let request = AnthropicRequest {
            model: MODEL,
            max_tokens: 10,
            system: "sys",
            messages: vec![AnthropicMessage {
                role: "user",
                content: vec![AnthropicBlock {
                    block_type: "text",
                    text: "hi".to_string(),
                }],
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["content"][0]["type"], "text");
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_unreadable_attachment_is_skipped() {
        let client = LlmClient::new("test-key".to_string(), Arc::new(MemoryArtifactStore::default()));
        let blocks = client
            .resolve_parts(&[
                MessagePart::File(ArtifactRef::new("missing.pdf")),
                MessagePart::Text("instructions".to_string()),
            ])
            .await;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "instructions");
    }

    #[tokio::test]
    async fn test_non_pdf_attachment_is_skipped() {
        let store = Arc::new(MemoryArtifactStore::default());
        store.insert(ArtifactRef::new("notes.txt"), b"plain text".to_vec());
        let client = LlmClient::new("test-key".to_string(), store);
        let blocks = client
            .resolve_parts(&[MessagePart::File(ArtifactRef::new("notes.txt"))])
            .await;
        assert!(blocks.is_empty());
    }
}
