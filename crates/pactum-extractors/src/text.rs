//! Plain-text ingestion.
//!
//! Pages are separated by form feeds. Each non-blank line becomes one text
//! box on a synthetic page one line-height per line tall, so layout-based
//! strategies behave the same way they do on PDFs.

use async_trait::async_trait;

use crate::error::{IngestError, IngestResult};
use crate::types::{Modality, PageLayout, RawDocument, TextBox, DEFAULT_PAGE_WIDTH};
use crate::Ingestor;

const MARGIN: f32 = 72.0;
const CHAR_WIDTH: f32 = 6.0;

/// Plain UTF-8 text ingestor.
#[derive(Debug, Clone)]
pub struct TextIngestor {
    /// Vertical advance per line, in points.
    line_height: f32,
}

impl TextIngestor {
    /// Create new text ingestor with a 12pt line height.
    pub fn new() -> Self {
        Self { line_height: 12.0 }
    }

    /// Create text ingestor with a custom line height.
    pub fn with_line_height(line_height: f32) -> Self {
        Self {
            line_height: line_height.max(1.0),
        }
    }

    fn layout_page(&self, page_number: usize, text: &str) -> PageLayout {
        let lines: Vec<&str> = text.lines().collect();

        // The synthetic page is exactly as tall as its text, so the bottom
        // band of the page is the tail of the text.
        let height = lines.len().max(1) as f32 * self.line_height;

        let boxes = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                let indent = line.len() - line.trim_start().len();
                TextBox::new(
                    line.trim(),
                    MARGIN + indent as f32 * CHAR_WIDTH,
                    i as f32 * self.line_height,
                    line.trim().chars().count() as f32 * CHAR_WIDTH,
                    self.line_height,
                )
            })
            .collect();

        PageLayout {
            page_number,
            width: DEFAULT_PAGE_WIDTH,
            height,
            text: text.to_string(),
            boxes,
        }
    }
}

impl Default for TextIngestor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ingestor for TextIngestor {
    async fn ingest(&self, content: &[u8]) -> IngestResult<RawDocument> {
        let text = std::str::from_utf8(content)
            .map_err(|e| IngestError::Unreadable(format!("Invalid UTF-8 text: {}", e)))?;

        // A trailing form feed ends the last page rather than starting a new one.
        let mut raw_pages: Vec<&str> = text.split('\x0c').collect();
        while raw_pages.len() > 1 && raw_pages.last().is_some_and(|p| p.trim().is_empty()) {
            raw_pages.pop();
        }

        let pages: Vec<PageLayout> = raw_pages
            .into_iter()
            .enumerate()
            .map(|(i, page)| self.layout_page(i + 1, page))
            .collect();

        let document = RawDocument::from_pages(pages, Modality::Text);
        if document.is_empty() {
            return Err(IngestError::EmptyContent);
        }

        tracing::debug!(pages = document.page_count(), "Ingested plain-text document");
        Ok(document)
    }

    fn supported_types(&self) -> &[&str] {
        &["text/plain"]
    }

    fn name(&self) -> &str {
        "plain-text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ingest_splits_pages_on_form_feed() {
        let ingestor = TextIngestor::new();
        let doc = ingestor
            .ingest(b"Master Services Agreement\x0cSignature page\nBy: Jane Doe")
            .await
            .unwrap();

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.modality, Modality::Text);
        assert!(doc.full_text.contains("Master Services Agreement"));
        assert_eq!(doc.pages[1].boxes.len(), 2);
        assert_eq!(doc.pages[1].boxes[1].text, "By: Jane Doe");
    }

    #[tokio::test]
    async fn test_trailing_form_feed_keeps_signature_page_last() {
        let ingestor = TextIngestor::new();
        let doc = ingestor
            .ingest(b"Terms.\x0cBy: John Smith\nTitle: CEO\n\x0c \n\x0c")
            .await
            .unwrap();

        assert_eq!(doc.page_count(), 2);
        let last = doc.last_page().unwrap();
        assert_eq!(last.page_number, 2);
        assert!(last.text.contains("John Smith"));
    }

    #[tokio::test]
    async fn test_ingest_rejects_blank_text() {
        let ingestor = TextIngestor::new();
        let result = ingestor.ingest(b"   \n\t\n").await;
        assert!(matches!(result, Err(IngestError::EmptyContent)));
    }

    #[tokio::test]
    async fn test_ingest_rejects_invalid_utf8() {
        let ingestor = TextIngestor::new();
        let result = ingestor.ingest(&[0xff, 0xfe, 0xfd]).await;
        assert!(matches!(result, Err(IngestError::Unreadable(_))));
    }

    #[test]
    fn test_page_height_tracks_line_count() {
        let ingestor = TextIngestor::new();
        let text = "line\n".repeat(10);
        let page = ingestor.layout_page(1, &text);

        assert_eq!(page.height, 120.0);
        let band: Vec<_> = page.bottom_band(0.30).collect();
        assert_eq!(band.len(), 3);
    }
}
