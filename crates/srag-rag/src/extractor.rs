//! Text extractor implementations

use async_trait::async_trait;
use pulldown_cmark::{Event, Parser, TagEnd};
use scraper::Html;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use srag_core::{DocumentType, Error, Result, TextExtractor};

use crate::config::PipelineConfig;

/// Recognizes text in an encoded image
#[async_trait]
pub trait ImageOcr: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String>;
}

/// OCR through the `tesseract` command, image on stdin and text on stdout
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: language.into(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl ImageOcr for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Extraction(format!("cannot run {}: {}", self.binary.display(), e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(Error::Extraction(format!(
                "tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// PDF text extraction backed by `pdf-extract`, with optional OCR of the
/// JPEG images embedded in each page
#[derive(Default)]
pub struct PdfExtractor {
    ocr: Option<Arc<dyn ImageOcr>>,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn ImageOcr>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    async fn text_layer(bytes: Vec<u8>) -> Result<String> {
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| Error::Extraction(format!("PDF extraction task failed: {}", e)))?
            .map_err(|e| Error::Extraction(format!("PDF extraction error: {}", e)))
    }

    async fn recognize_images(ocr: &dyn ImageOcr, bytes: Vec<u8>) -> Result<Vec<String>> {
        let images = tokio::task::spawn_blocking(move || page_images(&bytes))
            .await
            .map_err(|e| Error::Extraction(format!("PDF image task failed: {}", e)))??;

        let mut texts = Vec::new();
        for (page, image) in images {
            match ocr.recognize(&image).await {
                Ok(text) if !text.trim().is_empty() => texts.push(text.trim().to_string()),
                Ok(_) => {}
                Err(e) => tracing::warn!(page, error = %e, "OCR failed for image"),
            }
        }
        Ok(texts)
    }
}

/// Encoded images of every page, in page order. Raw pixel streams are skipped.
fn page_images(bytes: &[u8]) -> Result<Vec<(u32, Vec<u8>)>> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| Error::Extraction(format!("cannot read PDF images: {}", e)))?;

    let mut images = Vec::new();
    for (page, page_id) in document.get_pages() {
        let page_images = match document.get_page_images(page_id) {
            Ok(page_images) => page_images,
            Err(e) => {
                tracing::debug!(page, error = %e, "page images unreadable");
                continue;
            }
        };

        for image in page_images {
            let encoded = image
                .filters
                .as_deref()
                .is_some_and(|filters| filters.iter().any(|f| f == "DCTDecode" || f == "JPXDecode"));
            if encoded {
                images.push((page, image.content.to_vec()));
            } else {
                tracing::debug!(page, "skipping raw image stream");
            }
        }
    }

    Ok(images)
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    fn supports(&self, document_type: DocumentType) -> bool {
        document_type == DocumentType::Pdf
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String> {
        let Some(ocr) = &self.ocr else {
            let text = Self::text_layer(bytes.to_vec()).await?;
            if text.trim().is_empty() {
                return Err(Error::Extraction(
                    "PDF contains no extractable text (it may be image-based or encrypted)".to_string(),
                ));
            }
            return Ok(text);
        };

        let mut text = match Self::text_layer(bytes.to_vec()).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "PDF text layer unreadable, relying on OCR");
                String::new()
            }
        };

        for image_text in Self::recognize_images(ocr.as_ref(), bytes.to_vec()).await? {
            text.push('\n');
            text.push_str(&image_text);
        }

        if text.trim().is_empty() {
            return Err(Error::Extraction(
                "PDF contains no extractable text or recognizable images".to_string(),
            ));
        }

        Ok(text)
    }

    fn reads_images(&self) -> bool {
        self.ocr.is_some()
    }
}

/// UTF-8 plain text, passed through unchanged
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn supports(&self, document_type: DocumentType) -> bool {
        document_type == DocumentType::PlainText
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::Extraction(format!("text is not valid UTF-8: {}", e)))
    }
}

/// Markdown rendered down to its text content
pub struct MarkdownExtractor;

impl MarkdownExtractor {
    fn to_plain_text(markdown: &str) -> String {
        let mut text = String::new();

        for event in Parser::new(markdown) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push('\n'),
                Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::Heading(_))
                | Event::End(TagEnd::Item)
                | Event::End(TagEnd::CodeBlock) => text.push_str("\n\n"),
                _ => {}
            }
        }

        text.trim_end().to_string()
    }
}

#[async_trait]
impl TextExtractor for MarkdownExtractor {
    fn supports(&self, document_type: DocumentType) -> bool {
        document_type == DocumentType::Markdown
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String> {
        let markdown = std::str::from_utf8(bytes)
            .map_err(|e| Error::Extraction(format!("markdown is not valid UTF-8: {}", e)))?;
        Ok(Self::to_plain_text(markdown))
    }
}

/// Visible text of an HTML page; script and style contents are skipped
pub struct HtmlExtractor;

impl HtmlExtractor {
    const SKIPPED: [&'static str; 4] = ["script", "style", "noscript", "template"];

    fn to_plain_text(html: &str) -> String {
        let document = Html::parse_document(html);
        let mut lines = Vec::new();

        for node in document.root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| Self::SKIPPED.contains(&element.name()))
            });
            if hidden {
                continue;
            }

            let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !normalized.is_empty() {
                lines.push(normalized);
            }
        }

        lines.join("\n")
    }
}

#[async_trait]
impl TextExtractor for HtmlExtractor {
    fn supports(&self, document_type: DocumentType) -> bool {
        document_type == DocumentType::Html
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String> {
        let html = String::from_utf8_lossy(bytes);
        Ok(Self::to_plain_text(&html))
    }
}

/// Ordered set of extractors; the first one supporting a type wins
#[derive(Clone)]
pub struct ExtractorSet {
    extractors: Vec<Arc<dyn TextExtractor>>,
}

impl ExtractorSet {
    pub fn new(extractors: Vec<Arc<dyn TextExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn find(&self, document_type: DocumentType) -> Option<&Arc<dyn TextExtractor>> {
        self.extractors.iter().find(|e| e.supports(document_type))
    }

    pub fn supports(&self, document_type: DocumentType) -> bool {
        self.find(document_type).is_some()
    }

    pub fn reads_images(&self, document_type: DocumentType) -> bool {
        self.find(document_type).is_some_and(|e| e.reads_images())
    }

    /// Default extractors, with tesseract OCR for PDFs when `config.ocr` is set
    pub fn from_config(config: &PipelineConfig) -> Self {
        if !config.ocr {
            return Self::default();
        }

        let ocr = TesseractOcr::new(config.ocr_language.clone()).with_binary(config.tesseract_path.clone());
        Self::new(vec![
            Arc::new(PdfExtractor::new().with_ocr(Arc::new(ocr))),
            Arc::new(PlainTextExtractor),
            Arc::new(MarkdownExtractor),
            Arc::new(HtmlExtractor),
        ])
    }
}

impl Default for ExtractorSet {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(PdfExtractor::new()),
            Arc::new(PlainTextExtractor),
            Arc::new(MarkdownExtractor),
            Arc::new(HtmlExtractor),
        ])
    }
}
