//! Entity-based party extraction.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pactum_extractors::RawDocument;
use regex::Regex;

use super::{char_prefix, enclosing_sentence};
use crate::error::PactumResult;
use crate::models::SharedModel;
use crate::traits::{EntityLabel, EntityRecognizer, ExtractionStrategy};
use crate::types::{collapse_whitespace, ContractField, ExtractedField, FieldValue, StrategyKind};

/// Confidence for parties found by the recogniser.
pub const ENTITY_CONFIDENCE: f32 = 0.75;
/// Confidence for a representative named in the body text.
pub const REPRESENTATIVE_CONFIDENCE: f32 = 0.80;

// "Primary contact: Jane Doe" or "Jane Doe shall be the authorized representative".
static REPRESENTATIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(
            r"(?i:authorized\s+representatives?|primary\s+contact|contact\s+for\s+notices)\s*:\s*([A-Z][a-z]+(?:\s+[A-Z]\.)?\s+[A-Z][a-z]+(?:-[A-Z][a-z]+)?)",
        )
        .unwrap(),
        Regex::new(
            r"([A-Z][a-z]+(?:\s+[A-Z]\.)?\s+[A-Z][a-z]+)\s*,?\s*(?i:shall\s+be\s+the\s+authorized\s+representatives?)",
        )
        .unwrap(),
    ]
});

/// Case- and whitespace-insensitive key used to de-duplicate organisations.
fn org_key(name: &str) -> String {
    collapse_whitespace(name).to_lowercase()
}

/// Parties from the shared entity recogniser, plus a textual representative.
///
/// The first distinct organisation in the leading text becomes the customer,
/// the second the vendor.
pub struct EntityStrategy {
    recognizer: Arc<SharedModel<dyn EntityRecognizer>>,
    char_budget: usize,
}

impl EntityStrategy {
    pub fn new(recognizer: Arc<SharedModel<dyn EntityRecognizer>>, char_budget: usize) -> Self {
        Self {
            recognizer,
            char_budget,
        }
    }

    async fn parties(&self, text: &str) -> PactumResult<Vec<ExtractedField>> {
        let window = char_prefix(text, self.char_budget);
        let recognizer = self.recognizer.get().await?;
        let entities = recognizer.recognize(window).await?;

        let mut seen = HashSet::new();
        let organizations: Vec<_> = entities
            .into_iter()
            .filter(|e| e.label == EntityLabel::Organization)
            .filter(|e| !e.text.trim().is_empty())
            .filter(|e| seen.insert(org_key(&e.text)))
            .take(2)
            .collect();

        tracing::debug!(
            organizations = organizations.len(),
            recognizer = recognizer.model_name(),
            "Recognised parties"
        );

        let fields = [ContractField::CustomerName, ContractField::VendorName]
            .into_iter()
            .zip(organizations)
            .map(|(field, org)| {
                let in_bounds = org.start <= org.end
                    && window.is_char_boundary(org.start)
                    && window.is_char_boundary(org.end);
                let snippet = if in_bounds {
                    enclosing_sentence(window, org.start, org.end)
                } else {
                    org.text.as_str()
                };
                ExtractedField::new(
                    field,
                    FieldValue::Text(collapse_whitespace(&org.text)),
                    ENTITY_CONFIDENCE,
                    StrategyKind::Entity,
                )
                .with_snippet(snippet)
            })
            .collect();
        Ok(fields)
    }

    /// A person named as authorized representative or contact in the body text.
    fn representative(text: &str) -> Option<ExtractedField> {
        REPRESENTATIVE_PATTERNS.iter().find_map(|pattern| {
            let captures = pattern.captures(text)?;
            let name = captures.get(1)?;
            let whole = captures.get(0)?;
            Some(
                ExtractedField::new(
                    ContractField::AuthorizedSignatory,
                    FieldValue::Signatory {
                        name: collapse_whitespace(name.as_str()),
                        title: None,
                    },
                    REPRESENTATIVE_CONFIDENCE,
                    StrategyKind::Entity,
                )
                .with_snippet(enclosing_sentence(text, whole.start(), whole.end())),
            )
        })
    }
}

#[async_trait]
impl ExtractionStrategy for EntityStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Entity
    }

    async fn extract(&self, document: &RawDocument) -> PactumResult<Vec<ExtractedField>> {
        let mut fields = self.parties(&document.full_text).await?;
        fields.extend(Self::representative(&document.full_text));
        Ok(fields)
    }
}
