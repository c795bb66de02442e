use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{Config, ModelEngine};
use crate::utils::chat::{
    ChatCompletionRequest, ChatCompletionResponse, OllamaChatRequest, OllamaChatResponse,
    OllamaOptions, PromptMessage,
};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Model request failed: {0}")]
    Request(String),

    #[error("Model service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A chat-style language model behind some service
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the messages and return the assistant's reply text as-is
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}

async fn read_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    LlmError::Status { status, body }
}

/// Ollama native chat (`POST /api/chat`, non-streaming)
pub struct OllamaChat {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaChat {
    pub fn new(base_url: &str, model: &str, temperature: f32) -> Self {
        info!(
            "Initialized Ollama chat model: model={}, base_url={}, temperature={}",
            model, base_url, temperature
        );

        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for OllamaChat {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, LlmError> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        debug!(
            "Ollama reply: {} chars, eval_count={:?}",
            body.message.content.len(),
            body.eval_count
        );

        Ok(body.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI-compatible chat completions (`POST /chat/completions`)
pub struct OpenAIChat {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAIChat {
    pub fn new(base_url: &str, api_key: Option<&str>, model: &str, temperature: f32) -> Self {
        info!(
            "Initialized OpenAI-compatible chat model: model={}, base_url={}",
            model, base_url
        );

        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAIChat {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, LlmError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: Some(self.temperature),
            stream: false,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &body.usage {
            debug!("Completion usage: {} total tokens", usage.total_tokens);
        }

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

pub struct LlmFactory;

impl LlmFactory {
    pub fn from_config(config: &Config) -> Result<Arc<dyn ChatModel>, LlmError> {
        if config.chat_model.trim().is_empty() {
            return Err(LlmError::ConfigError("chat_model must not be empty".to_string()));
        }

        info!("Creating chat model: {:?}", config.chat_engine);

        let model: Arc<dyn ChatModel> = match config.chat_engine {
            ModelEngine::Ollama => Arc::new(OllamaChat::new(
                &config.chat_base_url,
                &config.chat_model,
                config.temperature,
            )),
            ModelEngine::OpenAI => Arc::new(OpenAIChat::new(
                &config.chat_base_url,
                config.chat_api_key.as_deref(),
                &config.chat_model,
                config.temperature,
            )),
        };

        Ok(model)
    }
}
