//! pactum-extractors - Document ingestion for contract field extraction.
//!
//! Turns uploaded bytes into a [`RawDocument`]: the full text plus
//! positioned text boxes for every page, so that both text-oriented and
//! layout-oriented extraction strategies can read the same normalised input.
//!
//! # Features
//!
//! - `pdf` (default) - PDF text via pdf-extract and layout via lopdf
//!
//! # Example
//!
//! ```ignore
//! use pactum_extractors::{IngestPipeline, IngestorFactory};
//!
//! // Use pipeline for automatic MIME type routing
//! let pipeline = IngestPipeline::with_defaults();
//! let document = pipeline.ingest(&pdf_bytes, "application/pdf").await?;
//!
//! // Or pick an ingestor directly
//! let text = IngestorFactory::text();
//! let document = text.ingest(b"Payment terms: Net 30").await?;
//! ```

mod error;
mod factory;
mod pipeline;
mod text;
mod types;

#[cfg(feature = "pdf")]
mod layout;

#[cfg(feature = "pdf")]
mod pdf;

pub use error::{IngestError, IngestResult};
pub use factory::IngestorFactory;
pub use pipeline::{mime_essence, sniff_mime, IngestPipeline};
pub use text::TextIngestor;
pub use types::{
    Modality, PageLayout, RawDocument, TextBox, BAND_TOLERANCE, DEFAULT_PAGE_HEIGHT,
    DEFAULT_PAGE_WIDTH,
};

#[cfg(feature = "pdf")]
pub use pdf::PdfIngestor;

use async_trait::async_trait;

/// Core Ingestor trait - every document format implements this.
#[async_trait]
pub trait Ingestor: Send + Sync {
    /// Parse raw bytes into a normalised document.
    async fn ingest(&self, content: &[u8]) -> IngestResult<RawDocument>;

    /// Supported MIME types for this ingestor.
    fn supported_types(&self) -> &[&str];

    /// Check if this ingestor handles the given MIME type.
    fn supports(&self, mime_type: &str) -> bool {
        self.supported_types().contains(&mime_type)
    }

    /// Human-readable name for this ingestor.
    fn name(&self) -> &str;
}
