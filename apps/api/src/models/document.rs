use bytes::Bytes;

/// An uploaded or derived file held in memory while a pipeline stage works on it.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Document {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name without its extension, used to name derived artifacts.
    pub fn stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.file_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_strips_last_extension() {
        let doc = Document::new("jane.doe.resume.pdf", "application/pdf", vec![1u8]);
        assert_eq!(doc.stem(), "jane.doe.resume");
    }

    #[test]
    fn test_stem_without_extension() {
        let doc = Document::new("resume", "application/pdf", vec![1u8]);
        assert_eq!(doc.stem(), "resume");
    }

    #[test]
    fn test_stem_dotfile_keeps_name() {
        let doc = Document::new(".pdf", "application/pdf", vec![1u8]);
        assert_eq!(doc.stem(), ".pdf");
    }
}
