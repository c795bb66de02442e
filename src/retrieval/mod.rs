pub mod chunking;
pub mod embeddings;
pub mod index;
pub mod loader;
pub mod sanitize;
pub mod vector;

pub use chunking::{split_documents, ChunkingConfig, ChunkingError};
pub use embeddings::{EmbeddingFactory, EmbeddingProvider};
pub use index::VectorIndex;
pub use sanitize::sanitize_chunks;
pub use vector::{LocalVectorStore, SearchResult, VectorError};
