use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::retrieval::embeddings::EmbeddingError;

/// Represents a single vector item to be stored in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorItem {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// A named set of vector items plus what is needed to query it later.
/// This is the unit written to and read from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    /// Model that produced every vector in `items`
    pub embedding_model: String,
    pub dimension: usize,
    pub created_at: DateTime<Utc>,
    pub items: Vec<VectorItem>,
}

/// One hit from a similarity search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Value,
    /// Cosine similarity, higher is closer
    pub score: f32,
}

impl SearchResult {
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

/// Error types for vector index operations
#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Cannot build an index from zero chunks")]
    EmptyCollection,

    #[error("Vector dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}
