use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use super::llm::ChatModel;
use super::rag::{RagAnswer, RagChain, RagError};
use crate::config::Config;
use crate::models::ChatMessage;
use crate::retrieval::loader::{is_supported, load_documents, FileOutcome};
use crate::retrieval::{
    sanitize_chunks, split_documents, ChunkingConfig, ChunkingError, EmbeddingProvider,
    LocalVectorStore, VectorError, VectorIndex,
};

pub const NO_DOCUMENTS_WARNING: &str = "No documents found. Upload at least one PDF or text file.";

pub const UPLOAD_SAVED: &str = "Files saved. Click 'Rebuild index' if needed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoIndex,
    /// Index loaded, waiting for a question
    IndexReady,
    Answering,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    NoIndex(String),

    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid chunking settings: {0}")]
    Chunking(#[from] ChunkingError),

    #[error(transparent)]
    Index(#[from] VectorError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error("Task join error: {0}")]
    Join(String),
}

/// A file received from the upload form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Result of a full index build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub documents_loaded: usize,
    pub chunks: usize,
    pub files: Vec<FileOutcome>,
    pub state: SessionState,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub name: String,
    pub entries: usize,
    pub embedding_model: String,
    pub dimension: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&VectorIndex> for IndexSummary {
    fn from(index: &VectorIndex) -> Self {
        Self {
            name: index.name().to_string(),
            entries: index.len(),
            embedding_model: index.embedding_model().to_string(),
            dimension: index.dimension(),
            created_at: index.created_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub message_count: usize,
    pub index: Option<IndexSummary>,
    pub warning: Option<String>,
    pub data_dir: PathBuf,
    pub index_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredDocument {
    pub name: String,
    pub size: u64,
}

/// Everything one chat session owns: the current index and chain, the
/// transcript, and the services used to rebuild them.
pub struct SessionContext {
    config: Arc<Config>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn ChatModel>,
    store: LocalVectorStore,
    state: SessionState,
    chain: Option<RagChain>,
    history: Vec<ChatMessage>,
    warning: Option<String>,
}

impl SessionContext {
    pub fn new(
        config: Arc<Config>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn ChatModel>,
    ) -> Self {
        let store = LocalVectorStore::new(config.persist_dir.clone());
        Self {
            config,
            embedder,
            llm,
            store,
            state: SessionState::NoIndex,
            chain: None,
            history: Vec::new(),
            warning: None,
        }
    }

    /// Load the persisted index if there is one, otherwise build it from the documents directory
    pub async fn initialize(&mut self) -> Result<SessionState, SessionError> {
        let loaded = VectorIndex::load(
            &self.store,
            &self.config.collection_name,
            self.embedder.clone(),
        );

        match loaded {
            Ok(Some(index)) => {
                info!(
                    "Using persisted index '{}' ({} entries)",
                    index.name(),
                    index.len()
                );
                self.install(index);
                Ok(self.state)
            }
            Ok(None) => {
                info!("No persisted index found, building from {}", self.config.data_dir.display());
                self.rebuild().await.map(|report| report.state)
            }
            Err(e) => {
                error!("Failed to load persisted index: {}", e);
                self.state = SessionState::NoIndex;
                Err(e.into())
            }
        }
    }

    /// Throw away the current index and build a new one from every document on disk.
    ///
    /// The persisted file is only replaced when the build succeeds.
    pub async fn rebuild(&mut self) -> Result<BuildReport, SessionError> {
        self.chain = None;
        self.state = SessionState::NoIndex;
        self.warning = None;

        let chunking = ChunkingConfig::from_config(&self.config)?;
        let data_dir = self.config.data_dir.clone();
        let outcome = tokio::task::spawn_blocking(move || load_documents(&data_dir))
            .await
            .map_err(|e| SessionError::Join(e.to_string()))??;

        let mut chunks = split_documents(&outcome.documents, &chunking);
        sanitize_chunks(&mut chunks);
        info!("Created {} chunks", chunks.len());

        let mut report = BuildReport {
            documents_loaded: outcome.report.loaded_count(),
            chunks: chunks.len(),
            files: outcome.report.files,
            state: SessionState::NoIndex,
            warning: None,
        };

        if chunks.is_empty() {
            warn!("{}", NO_DOCUMENTS_WARNING);
            // An index over documents that are gone must not come back on restart
            if self.store.has_collection(&self.config.collection_name) {
                self.store.delete_collection(&self.config.collection_name)?;
            }
            self.warning = Some(NO_DOCUMENTS_WARNING.to_string());
            report.warning = self.warning.clone();
            return Ok(report);
        }

        let index = VectorIndex::build(
            chunks,
            self.embedder.clone(),
            &self.store,
            &self.config.collection_name,
        )
        .await?;

        self.install(index);
        report.state = self.state;
        Ok(report)
    }

    fn install(&mut self, index: VectorIndex) {
        self.chain = Some(RagChain::new(
            Arc::new(index),
            self.llm.clone(),
            self.config.top_k,
        ));
        self.state = SessionState::IndexReady;
        self.warning = None;
    }

    /// Answer one question and record the exchange in the transcript
    pub async fn ask(&mut self, question: &str) -> Result<RagAnswer, SessionError> {
        if question.trim().is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        if self.state == SessionState::NoIndex {
            return Err(SessionError::NoIndex(self.no_index_message()));
        }

        let Some(chain) = self.chain.as_ref() else {
            self.state = SessionState::NoIndex;
            return Err(SessionError::NoIndex(self.no_index_message()));
        };

        let answering = AnsweringGuard::enter(&mut self.state);
        let result = chain.answer(question).await;
        drop(answering);

        let answer = result?;
        self.history.push(ChatMessage::user(question));
        self.history.push(ChatMessage::assistant(answer.answer.clone()));
        Ok(answer)
    }

    fn no_index_message(&self) -> String {
        self.warning
            .clone()
            .unwrap_or_else(|| "No index is loaded. Rebuild the index first.".to_string())
    }

    /// Store uploaded files in the documents directory under their base names.
    /// Existing files with the same name are overwritten; no index is built.
    pub async fn save_uploads(
        &self,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<String>, SessionError> {
        if files.is_empty() {
            return Err(SessionError::InvalidUpload("no files received".to_string()));
        }

        let mut named = Vec::with_capacity(files.len());
        for file in files {
            let name = base_name(&file.file_name).ok_or_else(|| {
                SessionError::InvalidUpload(format!("invalid file name {:?}", file.file_name))
            })?;
            if !is_supported(Path::new(&name)) {
                return Err(SessionError::InvalidUpload(format!(
                    "{} is not a PDF or text file",
                    name
                )));
            }
            named.push((name, file.bytes));
        }

        tokio::fs::create_dir_all(&self.config.data_dir).await?;

        let mut saved = Vec::with_capacity(named.len());
        for (name, bytes) in named {
            let path = self.config.data_dir.join(&name);
            tokio::fs::write(&path, &bytes).await?;
            info!("Saved upload {} ({} bytes)", path.display(), bytes.len());
            saved.push(name);
        }

        Ok(saved)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state(),
            message_count: self.history.len(),
            index: self.chain.as_ref().map(|chain| IndexSummary::from(chain.index())),
            warning: self.warning().map(str::to_string),
            data_dir: self.config.data_dir.clone(),
            index_path: self.config.index_path(),
        }
    }
}

/// Holds the session in `Answering` and puts it back to `IndexReady` when
/// dropped, including when the `ask` future is cancelled mid-answer.
struct AnsweringGuard<'a> {
    state: &'a mut SessionState,
}

impl<'a> AnsweringGuard<'a> {
    fn enter(state: &'a mut SessionState) -> Self {
        *state = SessionState::Answering;
        Self { state }
    }
}

impl Drop for AnsweringGuard<'_> {
    fn drop(&mut self) {
        *self.state = SessionState::IndexReady;
    }
}

/// Supported files currently in the documents directory, relative to it
pub fn stored_documents(data_dir: &Path) -> Result<Vec<StoredDocument>, SessionError> {
    if !data_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(data_dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || !is_supported(entry.path()) {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(data_dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        documents.push(StoredDocument {
            name,
            size: entry.metadata().map_err(std::io::Error::from)?.len(),
        });
    }
    Ok(documents)
}

/// Last path component of a client-supplied file name, either separator style
fn base_name(file_name: &str) -> Option<String> {
    let name = file_name.rsplit(&['/', '\\'][..]).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}
