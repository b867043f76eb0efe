//! The durable record written by the analysis pipeline.
//!
//! The serialized layout is shared with other readers of the key-value
//! store: `id`, `resumePath`, `imagePath`, `companyName`, `jobTitle`,
//! `jobDescription`, `feedback`, stored under `resume:<id>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::feedback::FeedbackDocument;
use crate::storage::ArtifactRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Key-value store key for this record.
    pub fn kv_key(&self) -> String {
        format!("resume:{}", self.0)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: RecordId,
    pub resume_path: ArtifactRef,
    pub image_path: ArtifactRef,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    /// Empty string on disk until the analysis stage has completed.
    #[serde(with = "feedback_field")]
    pub feedback: Option<FeedbackDocument>,
}

impl AnalysisRecord {
    pub fn key(&self) -> String {
        self.id.kv_key()
    }
}

mod feedback_field {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    use crate::models::feedback::FeedbackDocument;

    pub fn serialize<S: Serializer>(
        feedback: &Option<FeedbackDocument>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match feedback {
            Some(doc) => doc.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<FeedbackDocument>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            // Older writers stored the document string-encoded.
            Value::String(s) => serde_json::from_str(&s).map(Some).map_err(D::Error::custom),
            other => serde_json::from_value(other)
                .map(Some)
                .map_err(D::Error::custom),
        }
    }
}
