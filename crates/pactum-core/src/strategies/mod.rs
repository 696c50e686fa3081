//! Extraction strategies.
//!
//! Each strategy is an independent [`ExtractionStrategy`](crate::traits::ExtractionStrategy)
//! reading the same immutable document:
//!
//! - [`EntityStrategy`]: parties from the shared entity recogniser
//! - [`PatternStrategy`]: payment terms and billing cycle from regexes
//! - [`SignatureStrategy`]: signatory from the final-page signature zone
//! - [`SemanticStrategy`]: renewal terms by embedding similarity

mod entity;
mod pattern;
mod semantic;
mod signature;

pub use entity::{EntityStrategy, ENTITY_CONFIDENCE, REPRESENTATIVE_CONFIDENCE};
pub use pattern::{renewal_clause, PatternStrategy, RENEWAL_FALLBACK_CONFIDENCE};
pub use semantic::{SemanticStrategy, RENEWAL_PROTOTYPES};
pub use signature::{parse_signature_block, SignatureBlock, SignatureStrategy, SIGNATURE_CONFIDENCE};

use std::sync::Arc;

use crate::config::ExtractionConfig;
use crate::models::ModelRegistry;
use crate::traits::ExtractionStrategy;

/// The standard strategy set, wired to the shared models.
pub fn default_strategies(
    config: &ExtractionConfig,
    models: &ModelRegistry,
) -> Vec<Arc<dyn ExtractionStrategy>> {
    vec![
        Arc::new(EntityStrategy::new(
            Arc::clone(models.recognizer()),
            config.entity_char_budget,
        )),
        Arc::new(PatternStrategy::new()),
        Arc::new(SignatureStrategy::new(config.signature_zone_fraction)),
        Arc::new(SemanticStrategy::new(
            Arc::clone(models.embedder()),
            config.semantic_threshold,
            config.max_candidate_sentences,
        )),
    ]
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
pub(crate) fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// The sentence (or line) enclosing the byte range `start..end`.
pub(crate) fn enclosing_sentence(text: &str, start: usize, end: usize) -> &str {
    let is_break = |c: char| matches!(c, '.' | '!' | '?' | '\n');
    let from = text[..start]
        .rfind(is_break)
        .map(|i| i + 1)
        .unwrap_or(0);
    let to = text[end..]
        .find(is_break)
        .map(|i| end + i + 1)
        .unwrap_or(text.len());
    text[from..to].trim()
}

/// Split text into sentences.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace (so amounts like
/// `1,000.00` stay intact), or at a blank line. Whitespace is collapsed.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let next = chars.peek().copied();
        let terminated = matches!(c, '.' | '!' | '?') && next.map_or(true, char::is_whitespace);
        let blank_line = c == '\n' && next == Some('\n');
        if terminated || blank_line {
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let sentence = crate::types::collapse_whitespace(raw);
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
}
