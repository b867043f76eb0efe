use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extraction::Schema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeforeAfter {
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickSwap {
    pub from: String,
    pub to: Vec<String>,
}

/// Targeted rewrite help for a single `improve` tip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSuggestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub suggested_edits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_after: Option<Vec<BeforeAfter>>,
    /// Paste-ready lines, 1 to 3 by instruction.
    pub sample_lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_swaps: Option<Vec<QuickSwap>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Schema for StructuredSuggestion {
    /// Only the two required sequences are shape-checked; element types are
    /// left to deserialization.
    fn is_well_formed(value: &Value) -> bool {
        value.get("suggestedEdits").is_some_and(Value::is_array)
            && value.get("sampleLines").is_some_and(Value::is_array)
    }
}
