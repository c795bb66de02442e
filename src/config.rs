use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional settings file looked up in the working directory (`rag-chat.toml`, `.yaml`, ...)
const CONFIG_FILE: &str = "rag-chat";

/// Prefix for environment overrides, e.g. `RAG_CHAT_PORT=9000`
const ENV_PREFIX: &str = "RAG_CHAT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Backend used to talk to a model service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelEngine {
    /// Ollama native API (`/api/embed`, `/api/chat`)
    Ollama,
    /// Any OpenAI-compatible API (`/embeddings`, `/chat/completions`)
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cors_allow_origin: String,

    // Storage locations
    pub data_dir: PathBuf,
    pub persist_dir: PathBuf,
    pub collection_name: String,

    // Chunking and retrieval
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,

    // Embedding service
    pub embedding_engine: ModelEngine,
    pub embedding_model: String,
    pub embedding_base_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_batch_size: usize,

    // Language model service
    pub chat_engine: ModelEngine,
    pub chat_model: String,
    pub chat_base_url: String,
    pub chat_api_key: Option<String>,
    pub temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            cors_allow_origin: "*".to_string(),

            data_dir: PathBuf::from("data"),
            persist_dir: PathBuf::from("vector_store"),
            collection_name: "documents".to_string(),

            chunk_size: 400,
            chunk_overlap: 80,
            top_k: 5,

            // Model names must match `ollama list`
            embedding_engine: ModelEngine::Ollama,
            embedding_model: "nomic-embed-text:latest".to_string(),
            embedding_base_url: "http://localhost:11434".to_string(),
            embedding_api_key: None,
            embedding_batch_size: 32,

            chat_engine: ModelEngine::Ollama,
            chat_model: "llama3.2:latest".to_string(),
            chat_base_url: "http://localhost:11434".to_string(),
            chat_api_key: None,
            temperature: 0.1,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then `rag-chat.*` if present, then `RAG_CHAT_*` env vars.
    /// A `.env` file is read first so its values take part in the env layer.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(CONFIG_FILE).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be positive".to_string()));
        }
        if self.embedding_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "embedding_batch_size must be positive".to_string(),
            ));
        }
        if self.collection_name.is_empty()
            || self
                .collection_name
                .contains(|c: char| c == '/' || c == '\\' || c == '.')
        {
            return Err(ConfigError::Invalid(format!(
                "Invalid collection_name: {:?}",
                self.collection_name
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    /// Fixed on-disk location of the persisted vector index
    pub fn index_path(&self) -> PathBuf {
        index_path(&self.persist_dir, &self.collection_name)
    }
}

pub fn index_path(persist_dir: &Path, collection_name: &str) -> PathBuf {
    persist_dir.join(format!("{}.json", collection_name))
}
