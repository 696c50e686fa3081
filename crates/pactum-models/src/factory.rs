//! Factory for creating the shared models.

use std::sync::Arc;

use pactum_core::config::{EmbedderProvider, ModelsConfig, RecognizerProvider};
use pactum_core::error::PactumResult;
use pactum_core::models::{ModelRegistry, SharedModel};
use pactum_core::traits::{Embedder, EntityRecognizer};

use crate::lexicon::LexiconEmbedder;
use crate::ollama::OllamaEmbedder;
use crate::recognizer::HeuristicEntityRecognizer;

/// Factory for creating model handles from configuration.
///
/// Handles are lazy: nothing is built until the first job (or
/// [`ModelRegistry::warm_up`]) asks for the model.
pub struct ModelFactory;

impl ModelFactory {
    /// Create the entity recogniser handle.
    pub fn recognizer(config: &ModelsConfig) -> SharedModel<dyn EntityRecognizer> {
        match config.recognizer {
            RecognizerProvider::Heuristic => SharedModel::new("heuristic-ner", || async {
                Ok(Arc::new(HeuristicEntityRecognizer::new()) as Arc<dyn EntityRecognizer>)
            }),
        }
    }

    /// Create the sentence embedder handle.
    ///
    /// Remote settings are validated now so a bad URL fails at startup.
    pub fn embedder(config: &ModelsConfig) -> PactumResult<SharedModel<dyn Embedder>> {
        match config.embedder {
            EmbedderProvider::Lexicon => Ok(SharedModel::new("lexicon-v1", || async {
                Ok(Arc::new(LexiconEmbedder::new()) as Arc<dyn Embedder>)
            })),
            EmbedderProvider::Ollama => {
                let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(config)?);
                tracing::debug!(model = %config.embedder_model, "Configured Ollama embedder");
                Ok(SharedModel::new(config.embedder_model.clone(), move || {
                    let embedder = Arc::clone(&embedder);
                    async move { Ok(embedder) }
                }))
            }
        }
    }

    /// Create the registry shared by every strategy.
    pub fn registry(config: &ModelsConfig) -> PactumResult<ModelRegistry> {
        Ok(ModelRegistry::new(
            Self::recognizer(config),
            Self::embedder(config)?,
        ))
    }

    /// Registry with the offline defaults.
    pub fn offline() -> ModelRegistry {
        let config = ModelsConfig::default();
        ModelRegistry::new(
            Self::recognizer(&config),
            SharedModel::new("lexicon-v1", || async {
                Ok(Arc::new(LexiconEmbedder::new()) as Arc<dyn Embedder>)
            }),
        )
    }
}
