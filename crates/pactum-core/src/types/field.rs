//! Extracted contract fields and consolidated results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Maximum length of a stored source snippet, in characters.
pub const MAX_SNIPPET_CHARS: usize = 250;

/// The closed set of fields the engine knows how to extract.
///
/// Declaration order is the gap checklist order and the order of the
/// consolidated result.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractField {
    CustomerName,
    VendorName,
    AuthorizedSignatory,
    PaymentTerms,
    BillingCycle,
    RenewalTerms,
}

impl ContractField {
    /// All fields in checklist order.
    pub fn all() -> Vec<ContractField> {
        Self::iter().collect()
    }
}

/// Identity of the strategy that produced a candidate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Entity-based party extraction.
    Entity,
    /// Regex patterns over the full text.
    Pattern,
    /// Signature block geometry.
    Layout,
    /// Embedding similarity against renewal prototypes.
    Semantic,
}

/// Category assigned to a renewal clause.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RenewalCategory {
    /// The contract renews automatically.
    Affirmative,
    /// The contract explicitly does not renew automatically.
    Negative,
    /// Renewal depends on a condition such as a termination notice.
    Conditional,
    /// A renewal clause was found but not classified.
    Unclassified,
}

/// Value of an extracted field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Plain text such as a party name or payment terms.
    Text(String),
    /// A signatory with an optional title.
    Signatory {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// A classified renewal clause.
    Renewal {
        category: RenewalCategory,
        clause: String,
    },
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Render the value as a single string.
    ///
    /// Also used as the last tie-break key during consolidation.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Signatory { name, title: Some(title) } => format!("{}, {}", name, title),
            Self::Signatory { name, title: None } => name.clone(),
            Self::Renewal { category, clause } => format!("{}: {}", category, clause),
        }
    }

    /// Whether the value carries no usable content.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Signatory { name, .. } => name.trim().is_empty(),
            Self::Renewal { clause, .. } => clause.trim().is_empty(),
        }
    }
}

/// A single candidate or consolidated field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub field: ContractField,
    pub value: FieldValue,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    pub source: StrategyKind,
    /// Text the value was found in, at most [`MAX_SNIPPET_CHARS`] characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_snippet: Option<String>,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractedField {
    /// Create a new field candidate.
    pub fn new(
        field: ContractField,
        value: FieldValue,
        confidence: f32,
        source: StrategyKind,
    ) -> Self {
        Self {
            field,
            value,
            confidence,
            source,
            source_snippet: None,
            extracted_at: Utc::now(),
        }
    }

    /// Attach a source snippet, whitespace-collapsed and truncated.
    pub fn with_snippet(mut self, snippet: &str) -> Self {
        let collapsed = collapse_whitespace(snippet);
        if !collapsed.is_empty() {
            self.source_snippet = Some(collapsed.chars().take(MAX_SNIPPET_CHARS).collect());
        }
        self
    }

    /// Whether the candidate is usable by the consolidator.
    pub fn is_well_formed(&self) -> bool {
        self.confidence.is_finite()
            && (0.0..=1.0).contains(&self.confidence)
            && !self.value.is_blank()
    }
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparable view of a consolidated field, without timestamps or snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub value: FieldValue,
    pub confidence: f32,
    pub source: StrategyKind,
}

/// Consolidated extraction output: at most one entry per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionResult {
    fields: BTreeMap<ContractField, ExtractedField>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: ContractField) -> Option<&ExtractedField> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: ContractField) -> bool {
        self.fields.contains_key(&field)
    }

    /// Set the winning candidate for its field, replacing any previous one.
    pub(crate) fn insert(&mut self, extracted: ExtractedField) {
        self.fields.insert(extracted.field, extracted);
    }

    /// Iterate fields in checklist order.
    pub fn iter(&self) -> impl Iterator<Item = &ExtractedField> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field to (value, confidence, source), stable across runs on the same input.
    pub fn summary(&self) -> BTreeMap<ContractField, FieldSummary> {
        self.fields
            .iter()
            .map(|(field, extracted)| {
                (
                    *field,
                    FieldSummary {
                        value: extracted.value.clone(),
                        confidence: extracted.confidence,
                        source: extracted.source,
                    },
                )
            })
            .collect()
    }
}

impl FromIterator<ExtractedField> for ExtractionResult {
    fn from_iter<I: IntoIterator<Item = ExtractedField>>(iter: I) -> Self {
        let mut result = Self::new();
        for extracted in iter {
            result.insert(extracted);
        }
        result
    }
}

/// Checklist fields that are missing or below the acceptance threshold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GapList(Vec<ContractField>);

impl GapList {
    pub fn new(fields: Vec<ContractField>) -> Self {
        Self(fields)
    }

    pub fn contains(&self, field: ContractField) -> bool {
        self.0.contains(&field)
    }

    pub fn fields(&self) -> &[ContractField] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
