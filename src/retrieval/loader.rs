use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::sanitize::clean_bytes;
use crate::models::Document;

/// File extensions picked up from the documents directory
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse PDF {}: {reason}", .path.display())]
    Pdf { path: PathBuf, reason: String },

    #[error("Unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),
}

/// What happened to one file during a load
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    Loaded { path: PathBuf, characters: usize },
    Failed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub files: Vec<FileOutcome>,
}

impl LoadReport {
    pub fn loaded_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f, FileOutcome::Loaded { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files
            .iter()
            .filter(|f| matches!(f, FileOutcome::Failed { .. }))
    }
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub report: LoadReport,
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Load every PDF and text file under `dir`, recursively.
///
/// A file that cannot be read or parsed is recorded as a failure in the report
/// and skipped; it never aborts the load. The directory is created if missing.
pub fn load_documents(dir: &Path) -> std::io::Result<LoadOutcome> {
    fs::create_dir_all(dir)?;

    let mut outcome = LoadOutcome::default();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                warn!("Skipping unreadable entry {}: {}", path.display(), e);
                outcome.report.files.push(FileOutcome::Failed {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_supported(entry.path()) {
            continue;
        }

        let path = entry.into_path();
        match load_file(&path) {
            Ok(documents) => {
                let characters = documents.iter().map(|d| d.raw_text.chars().count()).sum();
                debug!(
                    "Loaded {} ({} documents, {} characters)",
                    path.display(),
                    documents.len(),
                    characters
                );
                outcome.report.files.push(FileOutcome::Loaded { path, characters });
                outcome.documents.extend(documents);
            }
            Err(e) => {
                warn!("{}", e);
                outcome.report.files.push(FileOutcome::Failed {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Loaded {} files into {} documents ({} failed)",
        outcome.report.loaded_count(),
        outcome.documents.len(),
        outcome.report.failures().count()
    );

    Ok(outcome)
}

/// Load a single supported file.
///
/// A text file becomes one document; a PDF becomes one document per page,
/// tagged with its zero-based page number.
pub fn load_file(path: &Path) -> Result<Vec<Document>, LoadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match extension.as_deref() {
        Some("txt") => Ok(vec![Document::new(clean_bytes(&bytes), path)]),
        Some("pdf") => {
            let pages = extract_pdf_pages(&bytes).map_err(|reason| LoadError::Pdf {
                path: path.to_path_buf(),
                reason,
            })?;
            Ok(pages
                .into_iter()
                .enumerate()
                .map(|(page, text)| Document::new(text, path).with_page(page))
                .collect())
        }
        _ => Err(LoadError::Unsupported(path.to_path_buf())),
    }
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, String> {
    // The PDF parser panics on some malformed inputs; treat that like any other parse failure
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(format!("{:?}", e)),
        Err(_) => Err("PDF parser panicked".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        assert!(is_supported(Path::new("a/b/notes.txt")));
        assert!(is_supported(Path::new("report.PDF")));
        assert!(!is_supported(Path::new("readme.md")));
        assert!(!is_supported(Path::new("no_extension")));
    }

    #[test]
    fn test_loads_text_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sky.txt"), "The sky is blue.").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("grass.TXT"), "Grass is green.").unwrap();
        fs::write(dir.path().join("ignored.md"), "# not loaded").unwrap();

        let outcome = load_documents(dir.path()).unwrap();
        assert_eq!(outcome.documents.len(), 2);
        assert_eq!(outcome.report.loaded_count(), 2);
        assert_eq!(outcome.report.failures().count(), 0);

        let texts: Vec<&str> = outcome.documents.iter().map(|d| d.raw_text.as_str()).collect();
        assert!(texts.contains(&"The sky is blue."));
        assert!(texts.contains(&"Grass is green."));
    }

    #[test]
    fn test_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");

        let outcome = load_documents(&data_dir).unwrap();
        assert!(data_dir.is_dir());
        assert!(outcome.documents.is_empty());
        assert!(outcome.report.files.is_empty());
    }

    #[test]
    fn test_unparseable_pdf_is_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.pdf"), b"this is not a pdf").unwrap();
        fs::write(dir.path().join("ok.txt"), "still indexed").unwrap();

        let outcome = load_documents(dir.path()).unwrap();
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].raw_text, "still indexed");

        let failures: Vec<_> = outcome.report.failures().collect();
        assert_eq!(failures.len(), 1);
        match failures[0] {
            FileOutcome::Failed { path, reason } => {
                assert!(path.ends_with("broken.pdf"));
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_only_unparseable_files_yields_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.pdf"), b"%PDF-garbage").unwrap();
        fs::write(dir.path().join("b.pdf"), b"").unwrap();

        let outcome = load_documents(dir.path()).unwrap();
        assert!(outcome.documents.is_empty());
        assert_eq!(outcome.report.failures().count(), 2);
    }

    #[test]
    fn test_invalid_utf8_text_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, b"caf\xe9 au lait").unwrap();

        let documents = load_file(&path).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].raw_text, "caf\u{FFFD} au lait");
        assert_eq!(documents[0].source_path, path);
        assert_eq!(documents[0].page, None);
    }

    /// Minimal uncompressed PDF with one Helvetica text line per page
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let font_id = 3;
        let page_ids: Vec<usize> = (0..pages.len()).map(|i| 4 + 2 * i).collect();
        let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();

        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                pages.len()
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];
        for (page_id, text) in page_ids.iter().zip(pages) {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
                font_id,
                page_id + 1
            ));
            let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                content
            ));
        }

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, object) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
        }

        let xref_offset = pdf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        ));
        pdf.extend_from_slice(xref.as_bytes());
        pdf
    }

    fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_valid_pdf_text_is_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sky.pdf");
        fs::write(&path, pdf_with_pages(&["The sky is blue."])).unwrap();

        let outcome = load_documents(dir.path()).unwrap();
        assert_eq!(outcome.report.failures().count(), 0);
        assert_eq!(outcome.report.loaded_count(), 1);
        assert_eq!(outcome.documents.len(), 1);

        let document = &outcome.documents[0];
        assert!(
            collapse_whitespace(&document.raw_text).contains("The sky is blue."),
            "{:?}",
            document.raw_text
        );
        assert_eq!(document.source_path, path);
        assert_eq!(document.page, Some(0));
    }

    #[test]
    fn test_pdf_yields_one_document_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        fs::write(
            &path,
            pdf_with_pages(&["Grass is green.", "Snow is white.", "Bananas are yellow."]),
        )
        .unwrap();

        let documents = load_file(&path).unwrap();
        assert_eq!(documents.len(), 3);
        for (i, expected) in ["Grass is green.", "Snow is white.", "Bananas are yellow."]
            .iter()
            .enumerate()
        {
            assert_eq!(documents[i].page, Some(i));
            assert!(collapse_whitespace(&documents[i].raw_text).contains(expected));
            assert_eq!(documents[i].metadata(0)["page"], i);
        }

        // Chunk positions restart on every page
        let chunks = crate::retrieval::split_documents(
            &documents,
            &crate::retrieval::ChunkingConfig::default(),
        );
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.metadata["chunk_index"] == 0));
        assert_eq!(chunks[2].metadata["page"], 2);
        assert_eq!(chunks[2].source(), path.to_str());
    }
}
