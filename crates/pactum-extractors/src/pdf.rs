//! PDF ingestion using pdf-extract for text and lopdf for layout.

use crate::error::{IngestError, IngestResult};
use crate::layout::{page_geometries, PageGeometry};
use crate::types::{Modality, PageLayout, RawDocument, DEFAULT_PAGE_HEIGHT, DEFAULT_PAGE_WIDTH};
use crate::Ingestor;
use async_trait::async_trait;

/// PDF ingestor.
///
/// Page text comes from pdf-extract; positioned boxes come from walking the
/// content streams with lopdf. Both are synchronous, so the work runs inside
/// spawn_blocking to avoid blocking the async runtime.
#[derive(Debug, Clone, Default)]
pub struct PdfIngestor {
    /// Minimum trimmed text length for a document to count as readable.
    /// Image-only scans fall below it.
    min_text_length: usize,
}

impl PdfIngestor {
    /// Create new PDF ingestor with default settings.
    pub fn new() -> Self {
        Self {
            min_text_length: 1,
        }
    }

    /// Ingest synchronously (called within spawn_blocking).
    fn ingest_sync(content: Vec<u8>, min_text_length: usize) -> IngestResult<RawDocument> {
        let page_texts = pdf_extract::extract_text_from_mem_by_pages(&content)
            .map_err(|e| IngestError::Pdf(format!("Failed to extract text: {}", e)))?;

        // Layout is best effort: a document whose text extracts but whose
        // content streams resist decoding still gets ingested, just without boxes.
        let geometries = match page_geometries(&content) {
            Ok(geometries) => geometries,
            Err(e) => {
                tracing::warn!(error = %e, "PDF layout unavailable, continuing with text only");
                Vec::new()
            }
        };

        let pages = merge_pages(page_texts, geometries);
        let document = RawDocument::from_pages(pages, Modality::Pdf);

        if document.full_text.trim().chars().count() < min_text_length.max(1) {
            return Err(IngestError::EmptyContent);
        }

        Ok(document)
    }
}

fn merge_pages(texts: Vec<String>, geometries: Vec<PageGeometry>) -> Vec<PageLayout> {
    let count = texts.len().max(geometries.len());
    let mut texts = texts.into_iter();
    let mut geometries = geometries.into_iter();

    (1..=count)
        .map(|page_number| {
            let text = texts.next().unwrap_or_default();
            let (width, height, boxes) = match geometries.next() {
                Some(g) => (g.width, g.height, g.boxes),
                None => (DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT, Vec::new()),
            };
            PageLayout {
                page_number,
                width,
                height,
                text,
                boxes,
            }
        })
        .collect()
}

#[async_trait]
impl Ingestor for PdfIngestor {
    async fn ingest(&self, content: &[u8]) -> IngestResult<RawDocument> {
        let content = content.to_vec();
        let min_text_length = self.min_text_length;

        let document =
            tokio::task::spawn_blocking(move || Self::ingest_sync(content, min_text_length))
                .await??;

        tracing::debug!(
            pages = document.page_count(),
            chars = document.full_text.len(),
            "Ingested PDF document"
        );
        Ok(document)
    }

    fn supported_types(&self) -> &[&str] {
        &["application/pdf"]
    }

    fn name(&self) -> &str {
        "pdf"
    }
}
