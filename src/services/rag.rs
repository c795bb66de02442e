use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::llm::{ChatModel, LlmError};
use crate::retrieval::{SearchResult, VectorError, VectorIndex};
use crate::utils::chat::PromptMessage;

/// Instruction sent with every question; `{context}` is replaced by the retrieved chunks
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions using the provided context. \
If the answer is not in the context, say you are not sure and avoid hallucinating.\n\nContext:\n{context}";

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] VectorError),

    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),
}

#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    /// Model output, unmodified
    pub answer: String,
    /// `source` of each retrieved chunk, in retrieval order, without duplicates
    pub sources: Vec<String>,
}

/// Retrieve top-k chunks, stuff them into the prompt, ask the model
pub struct RagChain {
    index: Arc<VectorIndex>,
    llm: Arc<dyn ChatModel>,
    top_k: usize,
}

impl RagChain {
    pub fn new(index: Arc<VectorIndex>, llm: Arc<dyn ChatModel>, top_k: usize) -> Self {
        Self { index, llm, top_k }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub async fn answer(&self, question: &str) -> Result<RagAnswer, RagError> {
        let retrieved = self.index.query(question, self.top_k).await?;
        debug!("Retrieved {} chunks for question", retrieved.len());

        let messages = build_messages(&retrieved, question);
        let answer = self.llm.complete(&messages).await?;

        info!(
            "Answered with {} ({} context chunks)",
            self.llm.model_name(),
            retrieved.len()
        );

        Ok(RagAnswer {
            answer,
            sources: collect_sources(&retrieved),
        })
    }
}

pub fn format_context(retrieved: &[SearchResult]) -> String {
    retrieved
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_messages(retrieved: &[SearchResult], question: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(SYSTEM_PROMPT.replace("{context}", &format_context(retrieved))),
        PromptMessage::user(question),
    ]
}

fn collect_sources(retrieved: &[SearchResult]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for source in retrieved.iter().filter_map(SearchResult::source) {
        if !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
        }
    }
    sources
}
