//! Named-entity recogniser trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::PactumResult;

/// Entity label assigned by a recogniser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityLabel {
    Organization,
    Person,
    Other,
}

/// An entity mention in the recognised text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: EntityLabel,
    /// Byte offset of the mention start.
    pub start: usize,
    /// Byte offset one past the mention end.
    pub end: usize,
}

impl Entity {
    pub fn new(text: impl Into<String>, label: EntityLabel, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            label,
            start,
            end,
        }
    }
}

/// Core EntityRecognizer trait - labels mentions in free text.
///
/// Implementations are loaded once and shared read-only across jobs.
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    /// Recognise entities, in order of appearance.
    async fn recognize(&self, text: &str) -> PactumResult<Vec<Entity>>;

    /// Get the model name.
    fn model_name(&self) -> &str;
}
