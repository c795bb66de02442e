use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use super::types::{Collection, VectorError};
use crate::config::index_path;

/// Collections persisted as JSON files under one directory.
///
/// A collection named `documents` lives at `<persist_dir>/documents.json`; the
/// presence of that file is what decides whether an index can be loaded.
#[derive(Debug, Clone)]
pub struct LocalVectorStore {
    persist_dir: PathBuf,
}

impl LocalVectorStore {
    pub fn new(persist_dir: impl Into<PathBuf>) -> Self {
        Self {
            persist_dir: persist_dir.into(),
        }
    }

    pub fn collection_path(&self, collection_name: &str) -> PathBuf {
        index_path(&self.persist_dir, collection_name)
    }

    pub fn has_collection(&self, collection_name: &str) -> bool {
        self.collection_path(collection_name).is_file()
    }

    /// Read a persisted collection, `None` if it was never written
    pub fn load_collection(
        &self,
        collection_name: &str,
    ) -> Result<Option<Collection>, VectorError> {
        let path = self.collection_path(collection_name);
        if !path.is_file() {
            debug!("No persisted collection at {}", path.display());
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&path)?);
        let collection: Collection = serde_json::from_reader(reader)?;

        info!(
            "Loaded collection '{}' from {} ({} entries)",
            collection.name,
            path.display(),
            collection.items.len()
        );

        Ok(Some(collection))
    }

    /// Write the whole collection, replacing any previous file atomically
    pub fn save_collection(&self, collection: &Collection) -> Result<PathBuf, VectorError> {
        fs::create_dir_all(&self.persist_dir)?;
        let path = self.collection_path(&collection.name);

        let mut temp = tempfile::NamedTempFile::new_in(&self.persist_dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, collection)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| VectorError::Storage(e.error))?;

        info!(
            "Persisted collection '{}' to {} ({} entries)",
            collection.name,
            path.display(),
            collection.items.len()
        );

        Ok(path)
    }

    pub fn delete_collection(&self, collection_name: &str) -> Result<(), VectorError> {
        let path = self.collection_path(collection_name);
        if !path.exists() {
            return Err(VectorError::CollectionNotFound(collection_name.to_string()));
        }

        fs::remove_file(&path)?;
        info!("Deleted collection '{}'", collection_name);
        Ok(())
    }
}
