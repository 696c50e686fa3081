//! Offline concept-space embedder.

use async_trait::async_trait;

use pactum_core::error::PactumResult;
use pactum_core::traits::Embedder;

/// Concept dimensions and the words that switch them on.
///
/// A trailing `*` matches any word with that prefix.
pub const CONCEPTS: [(&str, &[&str]); 6] = [
    ("automatic", &["automatic*", "evergreen"]),
    (
        "renewal",
        &["renew*", "extend*", "extension", "successive", "evergreen"],
    ),
    ("negation", &["not", "no", "never", "non", "cannot"]),
    (
        "condition",
        &["unless", "provided", "if", "until", "except", "subject"],
    ),
    ("termination", &["terminat*", "cancel*", "expir*", "notice"]),
    (
        "term",
        &["term", "terms", "period", "year", "years", "month", "months", "annual"],
    ),
];

/// Embeds text as a binary vector over [`CONCEPTS`].
///
/// Deterministic and dependency-free, so results are reproducible across
/// runs and machines. Text mentioning no concept maps to the zero vector.
#[derive(Debug, Clone, Default)]
pub struct LexiconEmbedder;

impl LexiconEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        CONCEPTS
            .iter()
            .map(|(_, cues)| {
                let hit = cues.iter().any(|cue| match cue.strip_suffix('*') {
                    Some(prefix) => words.iter().any(|w| w.starts_with(prefix)),
                    None => words.iter().any(|w| w == cue),
                });
                if hit {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for LexiconEmbedder {
    async fn embed(&self, text: &str) -> PactumResult<Vec<f32>> {
        Ok(Self::vector(text))
    }

    fn dimension(&self) -> usize {
        CONCEPTS.len()
    }

    fn model_name(&self) -> &str {
        "lexicon-v1"
    }
}
