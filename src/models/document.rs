use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;

/// Raw text extracted from one source file, or from one page of a PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub raw_text: String,
    pub source_path: PathBuf,
    /// Zero-based page number, set for PDF pages only
    pub page: Option<usize>,
}

impl Document {
    pub fn new(raw_text: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            raw_text: raw_text.into(),
            source_path: source_path.into(),
            page: None,
        }
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Metadata inherited by every chunk cut from this document
    pub fn metadata(&self, chunk_index: usize) -> serde_json::Value {
        let mut metadata = json!({
            "source": self.source_path.to_string_lossy(),
            "chunk_index": chunk_index,
        });
        if let Some(page) = self.page {
            metadata["page"] = json!(page);
        }
        metadata
    }
}

/// A bounded segment of a document, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: serde_json::Value,
}

impl Chunk {
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_source_from_document_metadata() {
        let doc = Document::new("The sky is blue.", "data/sky.txt");
        let chunk = Chunk {
            text: doc.raw_text.clone(),
            metadata: doc.metadata(0),
        };
        assert_eq!(chunk.source(), Some("data/sky.txt"));
        assert_eq!(chunk.metadata["chunk_index"], 0);
        assert!(chunk.metadata.get("page").is_none());
    }

    #[test]
    fn test_page_carried_into_metadata() {
        let doc = Document::new("Page two text.", "data/report.pdf").with_page(1);
        let metadata = doc.metadata(3);
        assert_eq!(metadata["source"], "data/report.pdf");
        assert_eq!(metadata["page"], 1);
        assert_eq!(metadata["chunk_index"], 3);
    }
}
