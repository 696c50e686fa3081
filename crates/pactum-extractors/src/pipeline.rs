//! Ingestion pipeline routing content to the matching ingestor.

use std::sync::Arc;

use crate::error::{IngestError, IngestResult};
use crate::types::RawDocument;
use crate::Ingestor;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Guess a MIME type from the leading bytes of a document.
///
/// PDFs are recognised by their header (leading whitespace is tolerated, as
/// some generators emit it). Valid UTF-8 is treated as plain text. Anything
/// else yields `None`.
pub fn sniff_mime(content: &[u8]) -> Option<&'static str> {
    let start = content
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(content.len());
    if content[start..].starts_with(PDF_MAGIC) {
        return Some("application/pdf");
    }
    if std::str::from_utf8(content).is_ok() {
        return Some("text/plain");
    }
    None
}

/// Strip parameters such as `; charset=utf-8` and normalise case.
pub fn mime_essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Pipeline for ingesting content using registered ingestors.
///
/// Automatically routes content to the appropriate ingestor based on MIME type.
pub struct IngestPipeline {
    ingestors: Vec<Arc<dyn Ingestor>>,
}

impl IngestPipeline {
    /// Create new empty pipeline.
    pub fn new() -> Self {
        Self {
            ingestors: Vec::new(),
        }
    }

    /// Create pipeline with all available ingestors.
    pub fn with_defaults() -> Self {
        Self {
            ingestors: crate::IngestorFactory::all(),
        }
    }

    /// Add an ingestor to the pipeline.
    pub fn add_ingestor(mut self, ingestor: Arc<dyn Ingestor>) -> Self {
        self.ingestors.push(ingestor);
        self
    }

    /// Ingest content using the ingestor registered for the MIME type.
    pub async fn ingest(&self, content: &[u8], mime_type: &str) -> IngestResult<RawDocument> {
        let mime_type = mime_essence(mime_type);
        let ingestor = self
            .ingestors
            .iter()
            .find(|i| i.supports(&mime_type))
            .ok_or_else(|| IngestError::UnsupportedType(mime_type.clone()))?;

        tracing::debug!(ingestor = ingestor.name(), mime = %mime_type, bytes = content.len(), "Ingesting document");
        ingestor.ingest(content).await
    }

    /// Ingest content, sniffing its type when none was declared.
    ///
    /// A generic `application/octet-stream` declaration is also sniffed.
    pub async fn ingest_auto(
        &self,
        content: &[u8],
        mime_type: Option<&str>,
    ) -> IngestResult<RawDocument> {
        let declared = mime_type
            .map(mime_essence)
            .filter(|m| !m.is_empty() && m != "application/octet-stream");

        let resolved = match declared {
            Some(m) => m,
            None => sniff_mime(content)
                .map(str::to_string)
                .ok_or_else(|| IngestError::UnsupportedType("unknown".to_string()))?,
        };
        self.ingest(content, &resolved).await
    }

    /// Check if pipeline can handle a given MIME type.
    pub fn supports(&self, mime_type: &str) -> bool {
        let mime_type = mime_essence(mime_type);
        self.ingestors.iter().any(|i| i.supports(&mime_type))
    }

    /// List all supported MIME types.
    pub fn supported_types(&self) -> Vec<&str> {
        self.ingestors
            .iter()
            .flat_map(|i| i.supported_types().iter().copied())
            .collect()
    }

    /// Get the number of registered ingestors.
    pub fn len(&self) -> usize {
        self.ingestors.len()
    }

    /// Check if the pipeline has no registered ingestors.
    pub fn is_empty(&self) -> bool {
        self.ingestors.is_empty()
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(b"%PDF-1.7\n..."), Some("application/pdf"));
        assert_eq!(sniff_mime(b"\n  %PDF-1.4"), Some("application/pdf"));
        assert_eq!(sniff_mime(b"Net 30"), Some("text/plain"));
        assert_eq!(sniff_mime(&[0xff, 0x00, 0xfe]), None);
    }

    #[test]
    fn test_mime_essence() {
        assert_eq!(mime_essence("Text/Plain; charset=UTF-8"), "text/plain");
        assert_eq!(mime_essence(""), "");
    }

    #[test]
    fn test_pipeline_creation() {
        let pipeline = IngestPipeline::with_defaults();
        assert!(pipeline.supports("text/plain"));
        assert!(pipeline.supports("text/plain; charset=utf-8"));

        #[cfg(feature = "pdf")]
        assert!(pipeline.supports("application/pdf"));
    }

    #[test]
    fn test_pipeline_empty() {
        let pipeline = IngestPipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.len(), 0);
        assert!(!pipeline.supports("text/plain"));
    }

    #[tokio::test]
    async fn test_pipeline_unsupported_type_error() {
        let pipeline = IngestPipeline::with_defaults();
        let result = pipeline.ingest(b"test", "image/png").await;
        assert!(matches!(result, Err(IngestError::UnsupportedType(_))));
    }

    #[tokio::test]
    async fn test_ingest_auto_sniffs_text() {
        let pipeline = IngestPipeline::with_defaults();
        let doc = pipeline
            .ingest_auto(b"Payment is due Net 30.", Some("application/octet-stream"))
            .await
            .unwrap();
        assert!(doc.full_text.contains("Net 30"));

        let doc = pipeline.ingest_auto(b"Net 45", None).await.unwrap();
        assert_eq!(doc.page_count(), 1);
    }

    #[tokio::test]
    async fn test_ingest_auto_rejects_binary() {
        let pipeline = IngestPipeline::with_defaults();
        let result = pipeline.ingest_auto(&[0xff, 0x00, 0xfe], None).await;
        assert!(matches!(result, Err(IngestError::UnsupportedType(_))));
    }
}
