use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::embeddings::{EmbeddingError, EmbeddingProvider};
use super::vector::{Collection, LocalVectorStore, SearchResult, VectorError, VectorItem};
use crate::models::Chunk;

/// Queryable handle over one persisted collection of embedded chunks
pub struct VectorIndex {
    collection: Collection,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("name", &self.collection.name)
            .field("embedding_model", &self.collection.embedding_model)
            .field("dimension", &self.collection.dimension)
            .field("entries", &self.collection.items.len())
            .finish()
    }
}

impl VectorIndex {
    /// Embed every chunk, persist the collection and return a handle to it.
    ///
    /// Nothing is written unless every chunk was embedded.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: &LocalVectorStore,
        collection_name: &str,
    ) -> Result<Self, VectorError> {
        if chunks.is_empty() {
            return Err(VectorError::EmptyCollection);
        }

        info!(
            "Embedding {} chunks with {}",
            chunks.len(),
            embedder.model_name()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(texts).await?;
        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            }
            .into());
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(VectorError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let items = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorItem {
                id: Uuid::new_v4().to_string(),
                text: chunk.text,
                vector,
                metadata: chunk.metadata,
            })
            .collect();

        let collection = Collection {
            name: collection_name.to_string(),
            embedding_model: embedder.model_name().to_string(),
            dimension,
            created_at: Utc::now(),
            items,
        };

        store.save_collection(&collection)?;

        Ok(Self {
            collection,
            embedder,
        })
    }

    /// Open a previously persisted collection without touching source documents.
    /// Returns `None` when nothing has been persisted under `collection_name`.
    pub fn load(
        store: &LocalVectorStore,
        collection_name: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Option<Self>, VectorError> {
        let Some(collection) = store.load_collection(collection_name)? else {
            return Ok(None);
        };

        if collection.embedding_model != embedder.model_name() {
            warn!(
                "Index '{}' was built with '{}' but '{}' is configured; rebuild the index if answers look off",
                collection.name,
                collection.embedding_model,
                embedder.model_name()
            );
        }

        Ok(Some(Self {
            collection,
            embedder,
        }))
    }

    /// Up to `k` entries most similar to `text`, closest first
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>, VectorError> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed_query(text).await?;
        self.search(&vector, k)
    }

    /// Brute-force cosine search. Ties keep insertion order.
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorError> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        if vector.len() != self.collection.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.collection.dimension,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .collection
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| (idx, cosine_similarity(vector, &item.vector)))
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        debug!(
            "Retrieved {} of {} entries from '{}'",
            scored.len(),
            self.len(),
            self.collection.name
        );

        Ok(scored
            .into_iter()
            .map(|(idx, score)| {
                let item = &self.collection.items[idx];
                SearchResult {
                    id: item.id.clone(),
                    text: item.text.clone(),
                    metadata: item.metadata.clone(),
                    score,
                }
            })
            .collect())
    }

    pub fn name(&self) -> &str {
        &self.collection.name
    }

    pub fn len(&self) -> usize {
        self.collection.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.items.is_empty()
    }

    pub fn embedding_model(&self) -> &str {
        &self.collection.embedding_model
    }

    pub fn dimension(&self) -> usize {
        self.collection.dimension
    }

    pub fn created_at(&self) -> chrono::DateTime<Utc> {
        self.collection.created_at
    }
}

/// Cosine similarity, 0.0 when either vector has zero length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
