//! Ollama embedding provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use pactum_core::config::ModelsConfig;
use pactum_core::error::{PactumError, PactumResult};
use pactum_core::traits::Embedder;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f64>,
}

/// Ollama embedding provider, calling `POST /api/embeddings`.
pub struct OllamaEmbedder {
    client: Client,
    endpoint: url::Url,
    model: String,
    dims: usize,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder.
    pub fn new(config: &ModelsConfig) -> PactumResult<Self> {
        let base_url = config
            .embedder_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let base = url::Url::parse(&base_url)
            .map_err(|e| PactumError::Configuration(format!("Invalid Ollama URL: {}", e)))?;
        let endpoint = base
            .join("api/embeddings")
            .map_err(|e| PactumError::Configuration(format!("Invalid Ollama URL: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PactumError::model_load(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            model: config.embedder_model.clone(),
            dims: config.embedding_dims,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> PactumResult<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| PactumError::model(format!("Ollama embedding error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PactumError::model(format!(
                "Ollama embedding error ({}): {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PactumError::model(format!("Failed to parse Ollama response: {}", e)))?;

        // Convert f64 to f32
        Ok(parsed.embedding.into_iter().map(|v| v as f32).collect())
    }

    fn dimension(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_base_url() {
        let config = ModelsConfig {
            embedder_base_url: Some("http://gpu-box:11434/".to_string()),
            ..Default::default()
        };
        let embedder = OllamaEmbedder::new(&config).unwrap();
        assert_eq!(embedder.endpoint(), "http://gpu-box:11434/api/embeddings");
        assert_eq!(embedder.model_name(), "nomic-embed-text");
        assert_eq!(embedder.dimension(), 768);
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let config = ModelsConfig {
            embedder_base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            OllamaEmbedder::new(&config),
            Err(PactumError::Configuration(_))
        ));
    }

    #[test]
    fn test_response_parsing() {
        let parsed: EmbeddingResponse =
            serde_json::from_str(r#"{"embedding":[0.5,-0.25]}"#).unwrap();
        assert_eq!(parsed.embedding, vec![0.5, -0.25]);
    }
}
