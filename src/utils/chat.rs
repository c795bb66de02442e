//! Wire types for the chat endpoints of Ollama and OpenAI-compatible servers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [PromptMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: PromptMessage,
}

/// Token accounting; only the total is logged
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub total_tokens: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [PromptMessage],
    pub stream: bool,
    pub options: OllamaOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct OllamaOptions {
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatResponse {
    pub message: PromptMessage,
    pub eval_count: Option<u64>,
}
