//! Read side of an analysis: the record plus whatever stored artifacts can
//! still be read. Missing artifacts degrade the view, they never fail it.

use bytes::Bytes;
use serde::Serialize;
use tracing::warn;

use crate::models::feedback::ScoreBand;
use crate::models::{FeedbackCategory, FeedbackDocument, RecordId};
use crate::storage::kv::load_record;
use crate::storage::{ArtifactRef, ArtifactStore, KvError, KvStore};

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub category: FeedbackCategory,
    pub title: &'static str,
    pub score: u8,
    pub band: ScoreBand,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: RecordId,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    /// `None` while the analysis has not populated it.
    pub feedback: Option<FeedbackDocument>,
    pub categories: Vec<CategorySummary>,
    pub source_available: bool,
    pub preview_available: bool,
}

pub fn summarize(feedback: &FeedbackDocument) -> Vec<CategorySummary> {
    FeedbackCategory::ALL
        .iter()
        .map(|&category| {
            let score = feedback.category(category).score;
            CategorySummary {
                category,
                title: category.title(),
                score,
                band: ScoreBand::for_score(score),
            }
        })
        .collect()
}

/// `Ok(None)` when no record exists under the id.
pub async fn load_review(
    kv: &dyn KvStore,
    artifacts: &dyn ArtifactStore,
    id: RecordId,
) -> Result<Option<ReviewView>, KvError> {
    let Some(record) = load_record(kv, id).await? else {
        return Ok(None);
    };

    let source_available = readable(artifacts, &record.resume_path).await;
    let preview_available = readable(artifacts, &record.image_path).await;
    let categories = record.feedback.as_ref().map(summarize).unwrap_or_default();

    Ok(Some(ReviewView {
        id: record.id,
        company_name: record.company_name,
        job_title: record.job_title,
        job_description: record.job_description,
        feedback: record.feedback,
        categories,
        source_available,
        preview_available,
    }))
}

/// Preview image bytes, `Ok(None)` if the record or the image is gone.
pub async fn load_preview(
    kv: &dyn KvStore,
    artifacts: &dyn ArtifactStore,
    id: RecordId,
) -> Result<Option<Bytes>, KvError> {
    let Some(record) = load_record(kv, id).await? else {
        return Ok(None);
    };
    match artifacts.read(&record.image_path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) => {
            warn!("Preview for {id} unavailable: {e}");
            Ok(None)
        }
    }
}

async fn readable(artifacts: &dyn ArtifactStore, artifact: &ArtifactRef) -> bool {
    match artifacts.exists(artifact).await {
        Ok(found) => {
            if !found {
                warn!("Artifact {artifact} is missing");
            }
            found
        }
        Err(e) => {
            warn!("Artifact {artifact} unavailable: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::save_record;
    use crate::storage::memory::{MemoryArtifactStore, MemoryKvStore};
    use crate::testing::{sample_feedback, sample_record};

    async fn seeded(with_preview: bool) -> (MemoryKvStore, MemoryArtifactStore, RecordId) {
        let kv = MemoryKvStore::default();
        let artifacts = MemoryArtifactStore::default();
        let record = sample_record(Some(sample_feedback()));
        artifacts.insert(record.resume_path.clone(), b"%PDF-1.4".to_vec());
        if with_preview {
            artifacts.insert(record.image_path.clone(), b"\x89PNG".to_vec());
        }
        save_record(&kv, &record).await.unwrap();
        (kv, artifacts, record.id)
    }

    #[tokio::test]
    async fn test_review_with_all_artifacts() {
        let (kv, artifacts, id) = seeded(true).await;
        let view = load_review(&kv, &artifacts, id).await.unwrap().unwrap();
        assert!(view.source_available);
        assert!(view.preview_available);
        assert_eq!(view.categories.len(), 5);
        assert_eq!(view.categories[0].title, "ATS Score");
        assert_eq!(view.categories[0].band, ScoreBand::Strong);
    }

    #[tokio::test]
    async fn test_availability_check_does_not_download_artifacts() {
        let (kv, artifacts, id) = seeded(true).await;
        let view = load_review(&kv, &artifacts, id).await.unwrap().unwrap();
        assert!(view.source_available && view.preview_available);
        assert_eq!(artifacts.reads(), 0);
    }

    #[tokio::test]
    async fn test_missing_preview_degrades_view() {
        let (kv, artifacts, id) = seeded(false).await;
        let view = load_review(&kv, &artifacts, id).await.unwrap().unwrap();
        assert!(view.source_available);
        assert!(!view.preview_available);
        assert!(view.feedback.is_some());
        assert!(load_preview(&kv, &artifacts, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pending_feedback_has_no_categories() {
        let kv = MemoryKvStore::default();
        let artifacts = MemoryArtifactStore::default();
        let record = sample_record(None);
        save_record(&kv, &record).await.unwrap();

        let view = load_review(&kv, &artifacts, record.id).await.unwrap().unwrap();
        assert!(view.feedback.is_none());
        assert!(view.categories.is_empty());
        assert!(!view.source_available);
    }

    #[tokio::test]
    async fn test_unknown_record_is_none() {
        let kv = MemoryKvStore::default();
        let artifacts = MemoryArtifactStore::default();
        assert!(load_review(&kv, &artifacts, RecordId::new())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_preview_bytes_are_returned() {
        let (kv, artifacts, id) = seeded(true).await;
        let bytes = load_preview(&kv, &artifacts, id).await.unwrap().unwrap();
        assert_eq!(&bytes[..], b"\x89PNG");
    }
}
