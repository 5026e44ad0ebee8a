//! Text extractor trait and document types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Kinds of upload the ingestion pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    PlainText,
    Markdown,
    Html,
}

impl DocumentType {
    /// Detect the document type from a filename extension
    pub fn from_filename(filename: &str) -> Option<DocumentType> {
        let extension = filename.rsplit_once('.')?.1.to_lowercase();
        match extension.as_str() {
            "pdf" => Some(DocumentType::Pdf),
            "txt" | "text" => Some(DocumentType::PlainText),
            "md" | "markdown" => Some(DocumentType::Markdown),
            "html" | "htm" => Some(DocumentType::Html),
            _ => None,
        }
    }

    /// Check that the payload looks like this document type
    pub fn matches_content(&self, bytes: &[u8]) -> bool {
        match self {
            DocumentType::Pdf => bytes.starts_with(b"%PDF"),
            DocumentType::PlainText | DocumentType::Markdown | DocumentType::Html => {
                std::str::from_utf8(bytes).is_ok()
            }
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "PDF",
            DocumentType::PlainText => "text",
            DocumentType::Markdown => "Markdown",
            DocumentType::Html => "HTML",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Trait for turning raw document bytes into plain text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Whether this extractor handles the given document type
    fn supports(&self, document_type: DocumentType) -> bool;

    /// Extract plain text from the payload
    async fn extract(&self, bytes: &[u8]) -> Result<String>;

    /// Whether text is also recognized from embedded images
    fn reads_images(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_from_filename() {
        assert_eq!(DocumentType::from_filename("report.pdf"), Some(DocumentType::Pdf));
        assert_eq!(DocumentType::from_filename("REPORT.PDF"), Some(DocumentType::Pdf));
        assert_eq!(DocumentType::from_filename("notes.md"), Some(DocumentType::Markdown));
        assert_eq!(DocumentType::from_filename("page.htm"), Some(DocumentType::Html));
        assert_eq!(DocumentType::from_filename("a.txt"), Some(DocumentType::PlainText));
        assert_eq!(DocumentType::from_filename("archive.zip"), None);
        assert_eq!(DocumentType::from_filename("no_extension"), None);
    }

    #[test]
    fn test_pdf_magic_bytes() {
        assert!(DocumentType::Pdf.matches_content(b"%PDF-1.7\n..."));
        assert!(!DocumentType::Pdf.matches_content(b"hello"));
        assert!(DocumentType::PlainText.matches_content(b"hello"));
        assert!(!DocumentType::PlainText.matches_content(&[0xff, 0xfe, 0xfd]));
    }
}
