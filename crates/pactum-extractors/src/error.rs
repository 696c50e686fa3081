//! Ingestion error types.

use thiserror::Error;

/// Errors that can occur while turning raw bytes into a [`RawDocument`](crate::RawDocument).
#[derive(Error, Debug)]
pub enum IngestError {
    /// Content type is not supported by any ingestor.
    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    /// The bytes could not be parsed as a document of the declared type.
    #[error("Unreadable document: {0}")]
    Unreadable(String),

    /// The document parsed but yielded no text.
    #[error("No extractable text in document")]
    EmptyContent,

    /// PDF-specific parse error.
    #[cfg(feature = "pdf")]
    #[error("PDF parse error: {0}")]
    Pdf(String),

    /// Task join error from spawn_blocking.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;
