//! PDF text extraction.
//!
//! Pages are read with `lopdf` and concatenated in order, each one introduced by a
//! `--- Page {n} ---` marker. A page that yields no text keeps its marker so page numbering in
//! the stored chunks stays aligned with the source document.

use lopdf::Document;
use thiserror::Error;

/// Largest upload accepted for extraction (10 MiB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Errors raised while turning uploaded bytes into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Upload exceeds [`MAX_FILE_SIZE`].
    #[error("File too large. Max allowed size is 10 MB.")]
    Oversize {
        /// Number of bytes received.
        size: usize,
    },
    /// Bytes could not be parsed as a PDF document.
    #[error("Unable to read PDF: {0}")]
    Unreadable(String),
    /// Every page came back empty (image-only or encrypted documents).
    #[error("No text extracted from PDF. Might be image-only or password-protected.")]
    NoText,
}

/// Text recovered from a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// One-based page number.
    pub number: u32,
    /// Raw extracted text; empty when the page has none.
    pub text: String,
}

/// Full annotated document text ready for chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Concatenated page markers and page text.
    pub text: String,
    /// Number of pages in the source document.
    pub page_count: usize,
}

impl ExtractedDocument {
    /// Length of the annotated text in characters.
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }
}

/// Source of per-page text for a PDF byte buffer.
pub trait PdfExtractor: Send + Sync {
    /// Return every page of the document in order, including pages without text.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError>;
}

/// Extractor backed by `lopdf`.
#[derive(Debug, Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        let document =
            Document::load_mem(bytes).map_err(|error| ExtractionError::Unreadable(error.to_string()))?;

        let pages = document
            .get_pages()
            .into_keys()
            .map(|number| {
                let text = match document.extract_text(&[number]) {
                    Ok(text) => text,
                    Err(error) => {
                        tracing::warn!(page = number, error = %error, "Failed to extract page text");
                        String::new()
                    }
                };
                PageText { number, text }
            })
            .collect();

        Ok(pages)
    }
}

/// Validate the upload size, extract every page, and build the annotated document text.
pub fn extract_document(
    extractor: &dyn PdfExtractor,
    bytes: &[u8],
) -> Result<ExtractedDocument, ExtractionError> {
    if bytes.len() > MAX_FILE_SIZE {
        return Err(ExtractionError::Oversize { size: bytes.len() });
    }

    let pages = extractor.extract_pages(bytes)?;
    if pages.iter().all(|page| page.text.trim().is_empty()) {
        return Err(ExtractionError::NoText);
    }

    Ok(ExtractedDocument {
        text: annotate_pages(&pages),
        page_count: pages.len(),
    })
}

/// Concatenate pages, each introduced by its `--- Page {n} ---` marker.
pub fn annotate_pages(pages: &[PageText]) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(&format!("\n--- Page {} ---\n", page.number));
        if !page.text.is_empty() {
            text.push_str(&page.text);
            text.push('\n');
        }
    }
    text
}
