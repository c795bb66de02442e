use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{Config, ModelEngine};

/// Error types for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Expected {expected} embeddings, service returned {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Trait for embedding providers
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a list of texts, in input order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Embed a single query string
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })
    }
}

fn check_count(expected: usize, embeddings: &[Vec<f32>]) -> Result<(), EmbeddingError> {
    if embeddings.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: embeddings.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Ollama native embedding provider (`POST /api/embed`)
pub struct OllamaEmbeddings {
    client: HttpClient,
    base_url: String,
    model: String,
    batch_size: usize,
}

impl OllamaEmbeddings {
    pub fn new(base_url: &str, model: &str, batch_size: usize) -> Self {
        info!(
            "Initialized Ollama embeddings: model={}, base_url={}",
            model, base_url
        );

        Self {
            client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            batch_size: batch_size.max(1),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&OllamaEmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::ApiError(format!("Ollama request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiError(format!(
                "Failed to generate embeddings: {} - {}",
                status, error_text
            )));
        }

        let body: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::ApiError(format!("Invalid Ollama response: {}", e)))?;

        Ok(body.embeddings)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!("Embedding batch of {} texts", batch.len());
            all_embeddings.extend(self.embed_batch(batch).await?);
        }

        check_count(texts.len(), &all_embeddings)?;
        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI-compatible embedding provider
pub struct OpenAIEmbeddings {
    client: Client<OpenAIConfig>,
    model: String,
    batch_size: usize,
}

impl OpenAIEmbeddings {
    pub fn new(base_url: &str, api_key: Option<&str>, model: &str, batch_size: usize) -> Self {
        let mut config = OpenAIConfig::new().with_api_base(base_url.trim_end_matches('/'));
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }

        info!(
            "Initialized OpenAI-compatible embeddings: model={}, base_url={}",
            model, base_url
        );

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            batch_size: batch_size.max(1),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = CreateEmbeddingRequest {
            model: self.model.clone(),
            input: EmbeddingInput::StringArray(texts.to_vec()),
            encoding_format: None,
            user: None,
            dimensions: None,
        };

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| EmbeddingError::ApiError(format!("OpenAI API error: {}", e)))?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!("Embedding batch of {} texts", batch.len());
            all_embeddings.extend(self.embed_batch(batch).await?);
        }

        check_count(texts.len(), &all_embeddings)?;
        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Factory for creating embedding providers
pub struct EmbeddingFactory;

impl EmbeddingFactory {
    pub fn from_config(config: &Config) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
        if config.embedding_model.trim().is_empty() {
            return Err(EmbeddingError::ConfigError(
                "embedding_model must not be empty".to_string(),
            ));
        }

        info!("Creating embedding provider: {:?}", config.embedding_engine);

        let provider: Arc<dyn EmbeddingProvider> = match config.embedding_engine {
            ModelEngine::Ollama => Arc::new(OllamaEmbeddings::new(
                &config.embedding_base_url,
                &config.embedding_model,
                config.embedding_batch_size,
            )),
            ModelEngine::OpenAI => Arc::new(OpenAIEmbeddings::new(
                &config.embedding_base_url,
                config.embedding_api_key.as_deref(),
                &config.embedding_model,
                config.embedding_batch_size,
            )),
        };

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_uses_configured_model() {
        let provider = EmbeddingFactory::from_config(&Config::default()).unwrap();
        assert_eq!(provider.model_name(), "nomic-embed-text:latest");

        let config = Config {
            embedding_engine: ModelEngine::OpenAI,
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_base_url: "http://localhost:11434/v1".to_string(),
            ..Config::default()
        };
        let provider = EmbeddingFactory::from_config(&config).unwrap();
        assert_eq!(provider.model_name(), "text-embedding-3-small");
    }

    #[test]
    fn test_factory_rejects_empty_model() {
        let config = Config {
            embedding_model: " ".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            EmbeddingFactory::from_config(&config),
            Err(EmbeddingError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        // Nothing listens on port 9 (discard) in the test environment
        let provider = OllamaEmbeddings::new("http://127.0.0.1:9", "nomic-embed-text:latest", 8);
        let result = provider.embed(vec!["hello".to_string()]).await;
        assert!(matches!(result, Err(EmbeddingError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_empty_input_skips_request() {
        let provider = OllamaEmbeddings::new("http://127.0.0.1:9", "nomic-embed-text:latest", 8);
        assert!(provider.embed(Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires a running Ollama with nomic-embed-text pulled
    async fn test_ollama_embeddings() {
        let provider =
            OllamaEmbeddings::new("http://localhost:11434", "nomic-embed-text:latest", 8);
        let texts = vec!["Hello world".to_string(), "Test embedding".to_string()];

        let embeddings = provider.embed(texts).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), embeddings[1].len());
    }
}
