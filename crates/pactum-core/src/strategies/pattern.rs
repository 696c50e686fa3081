//! Pattern-based structured extraction.
//!
//! Ordered regex rules over the full text; for each field the first rule
//! that matches wins.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pactum_extractors::RawDocument;
use regex::Regex;

use super::enclosing_sentence;
use crate::error::PactumResult;
use crate::traits::ExtractionStrategy;
use crate::types::{
    collapse_whitespace, ContractField, ExtractedField, FieldValue, RenewalCategory, StrategyKind,
};

/// Confidence of the broad renewal-clause rule.
pub const RENEWAL_FALLBACK_CONFIDENCE: f32 = 0.70;

/// One extraction rule: a pattern, the capture group holding the value, and
/// the confidence assigned to a match.
struct FieldRule {
    regex: Regex,
    group: usize,
    confidence: f32,
}

impl FieldRule {
    fn new(pattern: &str, group: usize, confidence: f32) -> Self {
        Self {
            regex: Regex::new(pattern).unwrap(),
            group,
            confidence,
        }
    }
}

// Payment terms, most specific first.
static PAYMENT_TERMS_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![
        FieldRule::new(r"(?i)\b(net\s*-?\s*\d{1,3})\b", 1, 0.95),
        FieldRule::new(
            r"(?i)\b(\d{1,3}\s*days\s+(?:from|after|of)\s+(?:the\s+)?(?:invoice\s+date|date\s+of\s+(?:the\s+)?invoice|receipt(?:\s+of\s+(?:the\s+)?invoice)?))",
            1,
            0.90,
        ),
    ]
});

// A currency amount followed by a billing period.
static BILLING_CYCLE_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(
        r"(?i)(?:[$€£]\s*|\b(?:USD|EUR|GBP)\s*)\d[\d,]*(?:\.\d+)?\s*(?:per\s+(?:month|year|quarter|annum)|monthly|annually|quarterly|yearly|/\s*(?:month|year))\b",
        0,
        0.92,
    )]
});

// A sentence mentioning the term, expiry, renewal or termination of the agreement.
static RENEWAL_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)[^.!?]*?\b(?:term\s+of\s+this\s+agreement|expiration|renew\w*|terminat\w*)\b[^.!?]*[.!?]?",
    )
    .unwrap()
});

fn first_match(
    text: &str,
    rules: &[FieldRule],
    field: ContractField,
) -> Option<ExtractedField> {
    rules.iter().find_map(|rule| {
        let captures = rule.regex.captures(text)?;
        let value = captures.get(rule.group)?;
        let whole = captures.get(0)?;
        let collapsed = collapse_whitespace(value.as_str());
        if collapsed.is_empty() {
            return None;
        }
        Some(
            ExtractedField::new(
                field,
                FieldValue::Text(collapsed),
                rule.confidence,
                StrategyKind::Pattern,
            )
            .with_snippet(enclosing_sentence(text, whole.start(), whole.end())),
        )
    })
}

/// Broad renewal-clause rule, used when semantic classification is not confident.
///
/// Returns the first sentence mentioning the term, expiration, renewal or
/// termination of the agreement, unclassified, with source `Pattern`.
pub fn renewal_clause(text: &str) -> Option<ExtractedField> {
    let found = RENEWAL_CLAUSE.find(text)?;
    let clause = collapse_whitespace(found.as_str());
    if clause.is_empty() {
        return None;
    }
    Some(
        ExtractedField::new(
            ContractField::RenewalTerms,
            FieldValue::Renewal {
                category: RenewalCategory::Unclassified,
                clause: clause.clone(),
            },
            RENEWAL_FALLBACK_CONFIDENCE,
            StrategyKind::Pattern,
        )
        .with_snippet(&clause),
    )
}

/// Regex extractor for payment terms and billing cycle.
#[derive(Debug, Default)]
pub struct PatternStrategy;

impl PatternStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Run every rule set against `text`.
    pub fn extract_text(&self, text: &str) -> Vec<ExtractedField> {
        [
            first_match(text, &PAYMENT_TERMS_RULES, ContractField::PaymentTerms),
            first_match(text, &BILLING_CYCLE_RULES, ContractField::BillingCycle),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[async_trait]
impl ExtractionStrategy for PatternStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Pattern
    }

    async fn extract(&self, document: &RawDocument) -> PactumResult<Vec<ExtractedField>> {
        Ok(self.extract_text(&document.full_text))
    }
}
