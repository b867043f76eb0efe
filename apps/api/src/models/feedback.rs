//! Bulk resume feedback as returned by the analysis stage.
//!
//! Field names follow the camelCase JSON the model is instructed to produce,
//! which is also the layout persisted inside `AnalysisRecord.feedback`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::extraction::Schema;

/// Whether a tip praises the resume or asks for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}

/// A single piece of feedback inside a category. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    /// Short headline.
    pub tip: String,
    /// ATS tips are headline-only, so this defaults to empty.
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFeedback {
    /// 0..=100, always present even when `tips` is empty.
    #[serde(deserialize_with = "rounded_score")]
    pub score: u8,
    #[serde(default)]
    pub tips: Vec<Tip>,
}

/// The named feedback categories, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeedbackCategory {
    #[serde(rename = "ATS")]
    Ats,
    #[serde(rename = "toneAndStyle")]
    ToneAndStyle,
    #[serde(rename = "content")]
    Content,
    #[serde(rename = "structure")]
    Structure,
    #[serde(rename = "skills")]
    Skills,
}

impl FeedbackCategory {
    pub const ALL: [FeedbackCategory; 5] = [
        FeedbackCategory::Ats,
        FeedbackCategory::ToneAndStyle,
        FeedbackCategory::Content,
        FeedbackCategory::Structure,
        FeedbackCategory::Skills,
    ];

    /// JSON field name of the category inside a feedback document.
    pub fn field(self) -> &'static str {
        match self {
            FeedbackCategory::Ats => "ATS",
            FeedbackCategory::ToneAndStyle => "toneAndStyle",
            FeedbackCategory::Content => "content",
            FeedbackCategory::Structure => "structure",
            FeedbackCategory::Skills => "skills",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            FeedbackCategory::Ats => "ATS Score",
            FeedbackCategory::ToneAndStyle => "Tone & Style",
            FeedbackCategory::Content => "Content",
            FeedbackCategory::Structure => "Structure",
            FeedbackCategory::Skills => "Skills",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Strong,
    Fair,
    Weak,
}

impl ScoreBand {
    pub fn for_score(score: u8) -> Self {
        match score {
            70.. => ScoreBand::Strong,
            40..=69 => ScoreBand::Fair,
            _ => ScoreBand::Weak,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDocument {
    #[serde(deserialize_with = "rounded_score")]
    pub overall_score: u8,
    #[serde(rename = "ATS")]
    pub ats: CategoryFeedback,
    pub tone_and_style: CategoryFeedback,
    pub content: CategoryFeedback,
    pub structure: CategoryFeedback,
    pub skills: CategoryFeedback,
}

impl FeedbackDocument {
    pub fn category(&self, category: FeedbackCategory) -> &CategoryFeedback {
        match category {
            FeedbackCategory::Ats => &self.ats,
            FeedbackCategory::ToneAndStyle => &self.tone_and_style,
            FeedbackCategory::Content => &self.content,
            FeedbackCategory::Structure => &self.structure,
            FeedbackCategory::Skills => &self.skills,
        }
    }

    pub fn tip(&self, category: FeedbackCategory, index: usize) -> Option<&Tip> {
        self.category(category).tips.get(index)
    }
}

/// Scores may arrive as `85` or `72.5`; both are kept as whole points.
fn rounded_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !(0.0..=100.0).contains(&raw) {
        return Err(serde::de::Error::custom(format!(
            "score {raw} is outside 0..=100"
        )));
    }
    Ok(raw.round() as u8)
}

fn is_score(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_f64)
        .is_some_and(|s| (0.0..=100.0).contains(&s))
}

fn is_category(value: Option<&Value>) -> bool {
    let Some(obj) = value.and_then(Value::as_object) else {
        return false;
    };
    is_score(obj.get("score")) && obj.get("tips").map_or(true, Value::is_array)
}

impl Schema for FeedbackDocument {
    fn is_well_formed(value: &Value) -> bool {
        is_score(value.get("overallScore"))
            && FeedbackCategory::ALL
                .iter()
                .all(|c| is_category(value.get(c.field())))
    }
}
