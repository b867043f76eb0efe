// Per-tip suggestion prompt templates.

use crate::llm_client::prompts::{fill_template, JSON_ONLY_REMINDER};

/// Schema the model must follow. Mirrors `StructuredSuggestion`.
pub const SUGGESTION_FORMAT: &str = r#"interface AISuggestion {
  title?: string;
  suggestedEdits: string[];        // max 3 short bullets
  beforeAfter?: { before: string; after: string }[]; // exact resume line changes
  sampleLines: string[];           // 1-3 paste-ready lines
  quickSwaps?: { from: string; to: string[] }[];
  notes?: string;
}"#;

const SUGGESTION_PROMPT_TEMPLATE: &str = r#"Return ONLY valid JSON that matches this TypeScript interface exactly.
Do not include explanations, markdown, or extra text.

{suggestion_format}

You are improving a resume.

Rules:
- Refer to the attached resume when possible.
- Suggest ONLY concrete, actionable edits.
- Keep suggestions short and specific.
- Do NOT repeat the tip or explanation.
- Prefer showing exact line replacements.

Context:
Tip: "{tip}"
Issue: "{explanation}"

{json_only}"#;

pub fn build_suggestion_instructions(tip: &str, explanation: &str) -> String {
    fill_template(
        SUGGESTION_PROMPT_TEMPLATE,
        &[
            ("suggestion_format", SUGGESTION_FORMAT),
            ("json_only", JSON_ONLY_REMINDER),
            ("tip", tip.trim()),
            ("explanation", explanation.trim()),
        ],
    )
}
