//! Factory for creating ingestors.

use std::sync::Arc;

use crate::text::TextIngestor;
use crate::Ingestor;

#[cfg(feature = "pdf")]
use crate::PdfIngestor;

/// Factory for creating document ingestors.
pub struct IngestorFactory;

impl IngestorFactory {
    /// Create a plain-text ingestor.
    pub fn text() -> Arc<dyn Ingestor> {
        Arc::new(TextIngestor::new())
    }

    /// Create a PDF ingestor.
    #[cfg(feature = "pdf")]
    pub fn pdf() -> Arc<dyn Ingestor> {
        Arc::new(PdfIngestor::new())
    }

    /// Get all available ingestors.
    #[allow(clippy::vec_init_then_push)]
    pub fn all() -> Vec<Arc<dyn Ingestor>> {
        let mut ingestors: Vec<Arc<dyn Ingestor>> = Vec::new();

        #[cfg(feature = "pdf")]
        ingestors.push(Self::pdf());

        ingestors.push(Self::text());

        ingestors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_all_ingestors() {
        let ingestors = IngestorFactory::all();

        #[cfg(feature = "pdf")]
        assert_eq!(ingestors.len(), 2);

        #[cfg(not(feature = "pdf"))]
        assert_eq!(ingestors.len(), 1);
    }

    #[test]
    fn test_factory_ingestors_cover_accepted_types() {
        let ingestors = IngestorFactory::all();
        assert!(ingestors.iter().any(|i| i.supports("text/plain")));

        #[cfg(feature = "pdf")]
        assert!(ingestors.iter().any(|i| i.supports("application/pdf")));

        assert!(!ingestors.iter().any(|i| i.supports("image/png")));
    }
}
