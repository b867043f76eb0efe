//! Document conversion. Renders the first page of an uploaded PDF to a PNG
//! preview.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::models::Document;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("File is not a PDF")]
    NotPdf,

    #[error("Converter could not run: {0}")]
    Io(#[from] std::io::Error),

    #[error("Converter exited with {status}: {stderr}")]
    Process { status: String, stderr: String },

    #[error("Converter produced no image")]
    NoOutput,
}

#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, file: &Document) -> Result<Document, ConversionError>;
}

/// Shells out to poppler's `pdftoppm` inside a scratch directory.
#[derive(Debug, Clone)]
pub struct PdftoppmConverter {
    program: PathBuf,
    dpi: u32,
}

impl PdftoppmConverter {
    pub fn new(program: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            program: program.into(),
            dpi,
        }
    }
}

pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

#[async_trait]
impl DocumentConverter for PdftoppmConverter {
    async fn convert(&self, file: &Document) -> Result<Document, ConversionError> {
        if !looks_like_pdf(&file.bytes) {
            return Err(ConversionError::NotPdf);
        }

        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("source.pdf");
        let output_prefix = scratch.path().join("preview");
        tokio::fs::write(&input, &file.bytes).await?;

        let output = Command::new(&self.program)
            .arg("-png")
            .args(["-f", "1", "-l", "1", "-singlefile"])
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(&input)
            .arg(&output_prefix)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ConversionError::Process {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // -singlefile writes exactly <prefix>.png
        let png_path = output_prefix.with_extension("png");
        let bytes = match tokio::fs::read(&png_path).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return Err(ConversionError::NoOutput),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConversionError::NoOutput)
            }
            Err(e) => return Err(e.into()),
        };
        debug!("pdftoppm rendered {} bytes at {} dpi", bytes.len(), self.dpi);

        let preview = Document::new(format!("{}.png", file.stem()), "image/png", bytes);
        info!("Converted {} to {}", file.file_name, preview.file_name);
        Ok(preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_magic_detection() {
        assert!(looks_like_pdf(b"%PDF-1.7\n..."));
        assert!(!looks_like_pdf(b"PK\x03\x04"));
        assert!(!looks_like_pdf(b""));
    }

    #[tokio::test]
    async fn test_non_pdf_is_rejected_before_spawning() {
        let converter = PdftoppmConverter::new("/nonexistent/pdftoppm", 110);
        let doc = Document::new("resume.docx", "application/msword", b"PK\x03\x04".to_vec());
        let err = converter.convert(&doc).await.unwrap_err();
        assert!(matches!(err, ConversionError::NotPdf));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let converter = PdftoppmConverter::new("/nonexistent/pdftoppm", 110);
        let doc = Document::new("resume.pdf", "application/pdf", b"%PDF-1.4\n".to_vec());
        let err = converter.convert(&doc).await.unwrap_err();
        assert!(matches!(err, ConversionError::Io(_)));
    }
}
