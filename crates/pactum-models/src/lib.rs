//! pactum-models - Entity recogniser and embedder implementations for pactum.
//!
//! This crate provides the models shared by the pactum extraction strategies.
//!
//! # Supported Models
//!
//! - **Heuristic** recogniser - organisation-suffix and person-title rules
//! - **Lexicon** embedder - offline, deterministic concept-space vectors
//! - **Ollama** embedder - local embedding models served by Ollama
//!
//! # Example
//!
//! ```ignore
//! use pactum_models::ModelFactory;
//!
//! // Build the registry described by the configuration
//! let models = ModelFactory::registry(&config.models)?;
//!
//! // Load everything up front instead of on the first job
//! models.warm_up().await?;
//! ```

mod factory;
mod lexicon;
mod ollama;
mod recognizer;

pub use factory::ModelFactory;
pub use lexicon::{LexiconEmbedder, CONCEPTS};
pub use ollama::OllamaEmbedder;
pub use recognizer::HeuristicEntityRecognizer;

// Re-export core types for convenience
pub use pactum_core::traits::{Embedder, Entity, EntityLabel, EntityRecognizer};
pub use pactum_core::{ModelRegistry, SharedModel};
