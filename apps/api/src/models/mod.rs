pub mod document;
pub mod feedback;
pub mod record;
pub mod suggestion;

pub use document::Document;
pub use feedback::{FeedbackCategory, FeedbackDocument, Tip, TipKind};
pub use record::{AnalysisRecord, RecordId};
pub use suggestion::StructuredSuggestion;
