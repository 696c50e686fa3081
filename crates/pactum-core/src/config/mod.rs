//! Configuration system for pactum.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{PactumError, PactumResult};
use crate::types::{ContractField, StrategyKind};

/// Tuning for the extraction strategies, consolidation and gap analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Characters of leading text handed to the entity recogniser.
    pub entity_char_budget: usize,
    /// Fraction of the final page, measured from the bottom, searched for signatures.
    pub signature_zone_fraction: f32,
    /// Minimum similarity for a semantic renewal classification.
    pub semantic_threshold: f32,
    /// Upper bound on sentences embedded by the semantic classifier.
    pub max_candidate_sentences: usize,
    /// Fields below this confidence are reported as gaps.
    pub acceptance_threshold: f32,
    /// Per-strategy wall-clock limit.
    pub strategy_timeout_secs: u64,
    /// Tie-break order for equal confidences, highest priority first.
    pub strategy_priority: Vec<StrategyKind>,
    /// Fields checked for gaps, in report order.
    pub critical_fields: Vec<ContractField>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            entity_char_budget: 50_000,
            signature_zone_fraction: 0.30,
            semantic_threshold: 0.65,
            max_candidate_sentences: 200,
            acceptance_threshold: 0.5,
            strategy_timeout_secs: 30,
            strategy_priority: vec![
                StrategyKind::Layout,
                StrategyKind::Pattern,
                StrategyKind::Semantic,
                StrategyKind::Entity,
            ],
            critical_fields: ContractField::all(),
        }
    }
}

/// Worker pool and retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent pipeline workers.
    pub worker_count: usize,
    /// Capacity of the dispatch queue.
    pub queue_capacity: usize,
    /// Total attempts per submission, including the first. 1 disables automatic retry.
    pub max_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 256,
            max_attempts: 1,
        }
    }
}

/// Entity recogniser implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerProvider {
    /// Rule-based organisation and person recogniser.
    #[default]
    Heuristic,
}

/// Sentence embedder implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderProvider {
    /// Offline concept-space embedder.
    #[default]
    Lexicon,
    /// Ollama embeddings endpoint.
    Ollama,
}

/// Shared model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub recognizer: RecognizerProvider,
    pub embedder: EmbedderProvider,
    /// Model name for remote embedders.
    pub embedder_model: String,
    /// Base URL for remote embedders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedder_base_url: Option<String>,
    /// Dimension reported by remote embedders.
    pub embedding_dims: usize,
    /// Request timeout for remote embedders.
    pub request_timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            recognizer: RecognizerProvider::default(),
            embedder: EmbedderProvider::default(),
            embedder_model: "nomic-embed-text".to_string(),
            embedder_base_url: None,
            embedding_dims: 768,
            request_timeout_secs: 30,
        }
    }
}

/// Where jobs, records and originals are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Sqlite,
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database path, or `:memory:`.
    pub sqlite_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let pactum_dir = dirs::home_dir()
            .map(|h| h.join(".pactum"))
            .unwrap_or_else(|| PathBuf::from(".pactum"));

        Self {
            backend: StoreBackend::default(),
            sqlite_path: pactum_dir.join("contracts.db"),
        }
    }
}

/// Main pactum configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PactumConfig {
    pub extraction: ExtractionConfig,
    pub worker: WorkerConfig,
    pub models: ModelsConfig,
    pub store: StoreConfig,
}

impl PactumConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> PactumResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| PactumError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| PactumError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| PactumError::Configuration(e.to_string()))?,
            _ => {
                return Err(PactumError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `PACTUM_*` environment variables on top of this configuration.
    ///
    /// Reads:
    /// - `PACTUM_WORKER_COUNT`, `PACTUM_QUEUE_CAPACITY`, `PACTUM_MAX_ATTEMPTS`
    /// - `PACTUM_STRATEGY_TIMEOUT_SECS`, `PACTUM_ACCEPTANCE_THRESHOLD`,
    ///   `PACTUM_SEMANTIC_THRESHOLD`, `PACTUM_STRATEGY_PRIORITY` (comma-separated)
    /// - `PACTUM_STORE` (`memory` or `sqlite`), `PACTUM_DB_PATH`
    /// - `PACTUM_EMBEDDER` (`lexicon` or `ollama`), `PACTUM_EMBEDDER_MODEL`,
    ///   `PACTUM_OLLAMA_URL`
    ///
    /// Unparseable values are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        env_parse("PACTUM_WORKER_COUNT", &mut self.worker.worker_count);
        env_parse("PACTUM_QUEUE_CAPACITY", &mut self.worker.queue_capacity);
        env_parse("PACTUM_MAX_ATTEMPTS", &mut self.worker.max_attempts);
        env_parse(
            "PACTUM_STRATEGY_TIMEOUT_SECS",
            &mut self.extraction.strategy_timeout_secs,
        );
        env_parse(
            "PACTUM_ACCEPTANCE_THRESHOLD",
            &mut self.extraction.acceptance_threshold,
        );
        env_parse(
            "PACTUM_SEMANTIC_THRESHOLD",
            &mut self.extraction.semantic_threshold,
        );

        if let Ok(priority) = std::env::var("PACTUM_STRATEGY_PRIORITY") {
            match parse_priority(&priority) {
                Ok(order) => self.extraction.strategy_priority = order,
                Err(e) => tracing::warn!(error = %e, "Ignoring PACTUM_STRATEGY_PRIORITY"),
            }
        }

        if let Ok(backend) = std::env::var("PACTUM_STORE") {
            match backend.to_lowercase().as_str() {
                "memory" => self.store.backend = StoreBackend::Memory,
                "sqlite" => self.store.backend = StoreBackend::Sqlite,
                other => tracing::warn!(value = other, "Ignoring unknown PACTUM_STORE"),
            }
        }
        if let Ok(path) = std::env::var("PACTUM_DB_PATH") {
            self.store.sqlite_path = PathBuf::from(path);
        }

        if let Ok(embedder) = std::env::var("PACTUM_EMBEDDER") {
            match embedder.to_lowercase().as_str() {
                "lexicon" => self.models.embedder = EmbedderProvider::Lexicon,
                "ollama" => self.models.embedder = EmbedderProvider::Ollama,
                other => tracing::warn!(value = other, "Ignoring unknown PACTUM_EMBEDDER"),
            }
        }
        if let Ok(model) = std::env::var("PACTUM_EMBEDDER_MODEL") {
            self.models.embedder_model = model;
        }
        if let Ok(url) = std::env::var("PACTUM_OLLAMA_URL") {
            self.models.embedder_base_url = Some(url);
        }

        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> PactumResult<()> {
        let e = &self.extraction;
        if !(0.0..=1.0).contains(&e.acceptance_threshold) {
            return Err(PactumError::Configuration(
                "extraction.acceptance_threshold must be within [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&e.semantic_threshold) {
            return Err(PactumError::Configuration(
                "extraction.semantic_threshold must be within [0, 1]".to_string(),
            ));
        }
        if !(e.signature_zone_fraction > 0.0 && e.signature_zone_fraction <= 1.0) {
            return Err(PactumError::Configuration(
                "extraction.signature_zone_fraction must be within (0, 1]".to_string(),
            ));
        }
        if e.critical_fields.is_empty() {
            return Err(PactumError::Configuration(
                "extraction.critical_fields must name at least one field".to_string(),
            ));
        }
        if e.strategy_timeout_secs == 0 {
            return Err(PactumError::Configuration(
                "extraction.strategy_timeout_secs must be positive".to_string(),
            ));
        }

        let w = &self.worker;
        if w.worker_count == 0 || w.queue_capacity == 0 || w.max_attempts == 0 {
            return Err(PactumError::Configuration(
                "worker.worker_count, worker.queue_capacity and worker.max_attempts must be positive"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> PactumConfigBuilder {
        PactumConfigBuilder::default()
    }
}

fn env_parse<T: FromStr>(name: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!(variable = name, value = %raw, "Ignoring unparseable value"),
        }
    }
}

/// Parse a comma-separated strategy list such as `layout,pattern,semantic,entity`.
pub fn parse_priority(raw: &str) -> PactumResult<Vec<StrategyKind>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            StrategyKind::from_str(&s.to_lowercase())
                .map_err(|_| PactumError::Configuration(format!("Unknown strategy: {}", s)))
        })
        .collect()
}

/// Builder for PactumConfig.
#[derive(Default)]
pub struct PactumConfigBuilder {
    config: PactumConfig,
}

impl PactumConfigBuilder {
    /// Set extraction configuration.
    pub fn extraction(mut self, config: ExtractionConfig) -> Self {
        self.config.extraction = config;
        self
    }

    /// Set worker configuration.
    pub fn worker(mut self, config: WorkerConfig) -> Self {
        self.config.worker = config;
        self
    }

    /// Set models configuration.
    pub fn models(mut self, config: ModelsConfig) -> Self {
        self.config.models = config;
        self
    }

    /// Set store configuration.
    pub fn store(mut self, config: StoreConfig) -> Self {
        self.config.store = config;
        self
    }

    /// Keep everything in memory.
    pub fn in_memory(mut self) -> Self {
        self.config.store.backend = StoreBackend::Memory;
        self
    }

    /// Set the gap acceptance threshold.
    pub fn acceptance_threshold(mut self, threshold: f32) -> Self {
        self.config.extraction.acceptance_threshold = threshold;
        self
    }

    /// Set the tie-break priority.
    pub fn strategy_priority(mut self, order: Vec<StrategyKind>) -> Self {
        self.config.extraction.strategy_priority = order;
        self
    }

    /// Set the maximum number of attempts per submission.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.worker.max_attempts = attempts;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> PactumResult<PactumConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PactumConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extraction.acceptance_threshold, 0.5);
        assert_eq!(config.worker.max_attempts, 1);
        assert!(config.store.sqlite_path.ends_with("contracts.db"));
    }

    #[test]
    fn test_from_toml_file_with_partial_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[extraction]
acceptance_threshold = 0.6
strategy_priority = ["pattern", "layout"]

[worker]
worker_count = 2
"#
        )
        .unwrap();

        let config = PactumConfig::from_file(file.path()).unwrap();
        assert_eq!(config.extraction.acceptance_threshold, 0.6);
        assert_eq!(
            config.extraction.strategy_priority,
            vec![StrategyKind::Pattern, StrategyKind::Layout]
        );
        assert_eq!(config.worker.worker_count, 2);
        assert_eq!(config.worker.queue_capacity, 256);
        assert_eq!(config.extraction.critical_fields, ContractField::all());
    }

    #[test]
    fn test_critical_fields_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[extraction]\ncritical_fields = [\"payment_terms\", \"customer_name\"]"
        )
        .unwrap();

        let config = PactumConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.extraction.critical_fields,
            vec![ContractField::PaymentTerms, ContractField::CustomerName]
        );

        let mut empty = config.clone();
        empty.extraction.critical_fields.clear();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "store:\n  backend: memory\nmodels:\n  embedder: ollama").unwrap();

        let config = PactumConfig::from_file(file.path()).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.models.embedder, EmbedderProvider::Ollama);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            PactumConfig::from_file(file.path()),
            Err(PactumError::Configuration(_))
        ));
    }

    #[test]
    fn test_builder_rejects_invalid_threshold() {
        let result = PactumConfig::builder().acceptance_threshold(1.5).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(
            parse_priority("Semantic, entity").unwrap(),
            vec![StrategyKind::Semantic, StrategyKind::Entity]
        );
        assert!(parse_priority("layout,guesswork").is_err());
    }
}
