//! Extraction strategy trait.

use async_trait::async_trait;
use pactum_extractors::RawDocument;

use crate::error::PactumResult;
use crate::types::{ExtractedField, StrategyKind};

/// One independent technique for extracting contract fields.
///
/// Strategies read the shared document and never mutate it. Adding a
/// strategy requires no change to the orchestrator or the consolidator.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Identity recorded as the source of every emitted field.
    fn kind(&self) -> StrategyKind;

    /// Human-readable name for logs.
    fn name(&self) -> &'static str {
        self.kind().into()
    }

    /// Extract candidate fields. An empty vector means nothing was found.
    async fn extract(&self, document: &RawDocument) -> PactumResult<Vec<ExtractedField>>;
}
