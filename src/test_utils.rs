//! Deterministic stand-ins for the embedding and language-model services.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::retrieval::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::services::llm::{ChatModel, LlmError};
use crate::utils::chat::PromptMessage;

const STOPWORDS: [&str; 12] = [
    "the", "what", "which", "who", "where", "when", "how", "why", "does", "and", "are", "is",
];

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(word: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn get_system_message(messages: &[PromptMessage]) -> Option<&PromptMessage> {
    messages.iter().find(|m| m.role == "system")
}

fn get_last_user_message(messages: &[PromptMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
}

/// Bag-of-words embedder: each word hashed into one of `dimension` buckets, L2-normalised
pub struct HashEmbedder {
    dimension: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            name: format!("hash-embedder-{}", dimension),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in words(text) {
            vector[(fnv1a(&word) % self.dimension as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

/// Behaves like an embedding service that is down
pub struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::ApiError(
            "Ollama request failed: connection refused".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        "unreachable"
    }
}

/// Answers only from the context block of the system message.
///
/// Replies with the first context sentence sharing a keyword with the question,
/// otherwise says it is not sure.
pub struct RuleChatModel;

#[async_trait::async_trait]
impl ChatModel for RuleChatModel {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, LlmError> {
        let context = get_system_message(messages)
            .and_then(|m| m.content.split_once("Context:\n"))
            .map(|(_, context)| context)
            .unwrap_or_default();
        let question = get_last_user_message(messages).unwrap_or_default();

        let keywords: Vec<String> = words(question)
            .filter(|w| w.len() >= 3 && !STOPWORDS.contains(&w.as_str()))
            .collect();

        let hit = context
            .split_inclusive(&['.', '\n'][..])
            .map(str::trim)
            .find(|sentence| words(sentence).any(|w| keywords.contains(&w)));

        Ok(match hit {
            Some(sentence) => format!("According to the documents: {}", sentence),
            None => "I'm not sure. The provided context does not answer that.".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "rule-model"
    }
}

/// Returns a fixed reply and records every prompt it was sent
pub struct RecordingChatModel {
    reply: String,
    calls: Mutex<Vec<Vec<PromptMessage>>>,
}

impl RecordingChatModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<PromptMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChatModel for RecordingChatModel {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "recording-model"
    }
}

/// Behaves like a language-model service that is down
pub struct FailingChatModel;

#[async_trait::async_trait]
impl ChatModel for FailingChatModel {
    async fn complete(&self, _messages: &[PromptMessage]) -> Result<String, LlmError> {
        Err(LlmError::Request("connection refused".to_string()))
    }

    fn model_name(&self) -> &str {
        "unreachable"
    }
}

/// Never finishes its first completion, then answers like `RuleChatModel`
#[derive(Default)]
pub struct HangOnceChatModel {
    hung: AtomicBool,
}

#[async_trait::async_trait]
impl ChatModel for HangOnceChatModel {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, LlmError> {
        if !self.hung.swap(true, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        RuleChatModel.complete(messages).await
    }

    fn model_name(&self) -> &str {
        "hang-once-model"
    }
}

mod tests {
    use super::*;

    #[test]
    fn test_message_lookup() {
        let messages = vec![
            PromptMessage::system("be nice"),
            PromptMessage::user("first"),
            PromptMessage::user("second"),
        ];
        assert_eq!(get_system_message(&messages).unwrap().content, "be nice");
        assert_eq!(get_last_user_message(&messages), Some("second"));
        assert!(get_system_message(&messages[1..]).is_none());
    }
}
