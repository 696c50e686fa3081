//! Rule-based entity recogniser.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use pactum_core::error::PactumResult;
use pactum_core::traits::{Entity, EntityLabel, EntityRecognizer};

// Capitalised words ending in a corporate suffix, e.g. "Acme Widgets, Inc".
static ORGANIZATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:[A-Z][A-Za-z0-9&'\-]*[ \t]+){1,6}?(?:[A-Z][A-Za-z0-9&'\-]*,?[ \t]+)?(?:Incorporated|Inc|L\.L\.C|LLC|LLP|Ltd|Limited|Corporation|Corp|Company|Co|GmbH|AG|PLC|Holdings|Group)\b",
    )
    .unwrap()
});

// Honorific followed by one or two capitalised names.
static PERSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:Mr|Ms|Mrs|Dr)\.?[ \t]+[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)?").unwrap()
});

// Capitalised words that open a sentence or label a party but are not part of a name.
const LEADING_STOP_WORDS: &[&str] = &[
    "the", "this", "that", "between", "and", "by", "of", "with", "to", "from", "for", "agreement",
    "customer", "vendor", "supplier", "client", "provider", "licensor", "licensee", "party",
    "whereas", "among", "signed",
];

/// Recognises organisations by corporate suffix and people by honorific.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEntityRecognizer;

impl HeuristicEntityRecognizer {
    pub fn new() -> Self {
        Self
    }

    fn organizations(text: &str) -> Vec<Entity> {
        ORGANIZATION
            .find_iter(text)
            .filter_map(|m| {
                let (offset, name) = strip_stop_words(m.as_str());
                // a bare suffix such as "Company" is not a name
                if !name.contains(char::is_whitespace) {
                    return None;
                }
                let start = m.start() + offset;
                Some(Entity::new(name, EntityLabel::Organization, start, start + name.len()))
            })
            .collect()
    }

    fn people(text: &str) -> Vec<Entity> {
        PERSON
            .find_iter(text)
            .map(|m| Entity::new(m.as_str(), EntityLabel::Person, m.start(), m.end()))
            .collect()
    }
}

/// Drop leading stop words, returning the byte offset of what remains.
fn strip_stop_words(candidate: &str) -> (usize, &str) {
    let mut rest = candidate;
    loop {
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let word = &rest[..word_end];
        if word_end == rest.len() || !LEADING_STOP_WORDS.contains(&word.to_lowercase().as_str()) {
            break;
        }
        rest = rest[word_end..].trim_start();
    }
    (candidate.len() - rest.len(), rest)
}

#[async_trait]
impl EntityRecognizer for HeuristicEntityRecognizer {
    async fn recognize(&self, text: &str) -> PactumResult<Vec<Entity>> {
        let mut entities = Self::organizations(text);
        entities.extend(Self::people(text));
        entities.sort_by_key(|e| e.start);
        Ok(entities)
    }

    fn model_name(&self) -> &str {
        "heuristic-ner"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn names(text: &str, label: EntityLabel) -> Vec<String> {
        HeuristicEntityRecognizer::new()
            .recognize(text)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.label == label)
            .map(|e| e.text)
            .collect()
    }

    #[tokio::test]
    async fn test_organizations_in_preamble() {
        let text = "This Agreement is entered into by and between Acme Widgets, Inc. and Globex Corporation.";
        assert_eq!(
            names(text, EntityLabel::Organization).await,
            vec!["Acme Widgets, Inc", "Globex Corporation"]
        );
    }

    #[tokio::test]
    async fn test_leading_stop_words_are_stripped() {
        let text = "Between Initech LLC and The Umbrella Group";
        let entities = HeuristicEntityRecognizer::new().recognize(text).await.unwrap();
        assert_eq!(entities[0].text, "Initech LLC");
        assert_eq!(&text[entities[0].start..entities[0].end], "Initech LLC");
        assert_eq!(entities[1].text, "Umbrella Group");
    }

    #[tokio::test]
    async fn test_lowercase_words_break_names() {
        assert_eq!(
            names("services provided by the Hooli Corp team", EntityLabel::Organization).await,
            vec!["Hooli Corp"]
        );
        assert!(names("the company shall pay", EntityLabel::Organization)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_people_by_honorific() {
        assert_eq!(
            names("Notices to Ms. Jane Doe at the address above.", EntityLabel::Person).await,
            vec!["Ms. Jane Doe"]
        );
    }
}
