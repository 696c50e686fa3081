//! Renewal-clause classification by embedding similarity.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pactum_extractors::RawDocument;
use regex::Regex;
use tokio::sync::OnceCell;

use super::{renewal_clause, split_sentences};
use crate::error::{PactumError, PactumResult};
use crate::models::SharedModel;
use crate::traits::{cosine_similarity, Embedder, ExtractionStrategy};
use crate::types::{ContractField, ExtractedField, FieldValue, RenewalCategory, StrategyKind};

/// Reference sentences, one per renewal category.
pub const RENEWAL_PROTOTYPES: [(RenewalCategory, &str); 3] = [
    (RenewalCategory::Affirmative, "The contract will automatically renew."),
    (RenewalCategory::Negative, "The contract will not automatically renew."),
    (
        RenewalCategory::Conditional,
        "The contract renews unless one party acts to terminate it.",
    ),
];

// Vocabulary a sentence must contain to be worth embedding.
static RENEWAL_VOCABULARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(renew\w*|terms?|terminat\w*|evergreen|expir\w*|extend\w*|extension)\b")
        .unwrap()
});

/// Classifies the document's renewal clause against [`RENEWAL_PROTOTYPES`].
///
/// Below the similarity threshold the broad renewal-clause rule is used
/// instead, recorded with source `Pattern`.
pub struct SemanticStrategy {
    embedder: Arc<SharedModel<dyn Embedder>>,
    threshold: f32,
    max_candidates: usize,
    prototypes: OnceCell<Vec<Vec<f32>>>,
}

impl SemanticStrategy {
    pub fn new(
        embedder: Arc<SharedModel<dyn Embedder>>,
        threshold: f32,
        max_candidates: usize,
    ) -> Self {
        Self {
            embedder,
            threshold,
            max_candidates,
            prototypes: OnceCell::new(),
        }
    }

    /// Sentences mentioning renewal vocabulary, page by page, capped.
    fn candidates(&self, document: &RawDocument) -> Vec<String> {
        document
            .pages
            .iter()
            .flat_map(|page| split_sentences(&page.text))
            .filter(|sentence| RENEWAL_VOCABULARY.is_match(sentence))
            .take(self.max_candidates)
            .collect()
    }

    async fn prototype_embeddings(&self, embedder: &dyn Embedder) -> PactumResult<&[Vec<f32>]> {
        let embeddings = self
            .prototypes
            .get_or_try_init(|| async {
                let texts: Vec<String> = RENEWAL_PROTOTYPES
                    .iter()
                    .map(|(_, text)| text.to_string())
                    .collect();
                embed_all(embedder, &texts).await
            })
            .await?;
        Ok(embeddings.as_slice())
    }

    /// Best (category, similarity, sentence) over all candidates.
    ///
    /// The first strictly greater score wins, so ties keep document order
    /// and prototype order.
    async fn best_match(
        &self,
        candidates: &[String],
    ) -> PactumResult<Option<(RenewalCategory, f32, String)>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let embedder = self.embedder.get().await?;
        let prototypes = self.prototype_embeddings(embedder.as_ref()).await?;
        let embeddings = embed_all(embedder.as_ref(), candidates).await?;

        let mut best: Option<(RenewalCategory, f32, String)> = None;
        for (sentence, embedding) in candidates.iter().zip(&embeddings) {
            for ((category, _), prototype) in RENEWAL_PROTOTYPES.iter().zip(prototypes) {
                let score = cosine_similarity(embedding, prototype);
                if best.as_ref().map_or(true, |(_, top, _)| score > *top) {
                    best = Some((*category, score, sentence.clone()));
                }
            }
        }
        Ok(best)
    }
}

async fn embed_all(embedder: &dyn Embedder, texts: &[String]) -> PactumResult<Vec<Vec<f32>>> {
    let embeddings = embedder.embed_batch(texts).await?;
    if embeddings.len() != texts.len() {
        return Err(PactumError::model(format!(
            "embedder '{}' returned {} vectors for {} texts",
            embedder.model_name(),
            embeddings.len(),
            texts.len()
        )));
    }
    Ok(embeddings)
}

#[async_trait]
impl ExtractionStrategy for SemanticStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Semantic
    }

    async fn extract(&self, document: &RawDocument) -> PactumResult<Vec<ExtractedField>> {
        let candidates = self.candidates(document);
        let best = self.best_match(&candidates).await?;

        match best {
            Some((category, score, sentence)) if score >= self.threshold => {
                tracing::debug!(%category, score, "Classified renewal clause");
                Ok(vec![ExtractedField::new(
                    ContractField::RenewalTerms,
                    FieldValue::Renewal {
                        category,
                        clause: sentence.clone(),
                    },
                    score.clamp(0.0, 1.0),
                    StrategyKind::Semantic,
                )
                .with_snippet(&sentence)])
            }
            best => {
                tracing::debug!(
                    candidates = candidates.len(),
                    best_score = best.map(|(_, score, _)| score),
                    "Renewal classification below threshold, using clause rule"
                );
                Ok(renewal_clause(&document.full_text).into_iter().collect())
            }
        }
    }
}
