use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

use crate::models::{Chunk, Document};

/// Boundaries tried in order: paragraph, line, sentence, word.
/// Grapheme clusters are the last resort.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

#[derive(Debug, thiserror::Error)]
pub enum ChunkingError {
    #[error("chunk_size must be positive")]
    ZeroChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Configuration for text chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            chunk_overlap: 80,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::ZeroChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &crate::config::Config) -> Result<Self, ChunkingError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

/// Split every document into chunks, tagging each with its source metadata
pub fn split_documents(documents: &[Document], config: &ChunkingConfig) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|doc| {
            chunk_text(&doc.raw_text, config.chunk_size, config.chunk_overlap)
                .into_iter()
                .enumerate()
                .map(move |(idx, text)| Chunk {
                    text,
                    metadata: doc.metadata(idx),
                })
        })
        .collect()
}

/// Chunk text into pieces of at most `chunk_size` characters.
///
/// Text is cut at the coarsest boundary that occurs in it, and only pieces that
/// are still too long are cut again at the next finer boundary. Small pieces
/// are then packed into windows; each new window starts with up to
/// `chunk_overlap` characters carried over from the previous one. Chunks are
/// trimmed and empty chunks dropped.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.trim().is_empty() || chunk_size == 0 {
        return vec![];
    }

    let splitter = Splitter {
        chunk_size,
        chunk_overlap: chunk_overlap.min(chunk_size - 1),
    };
    splitter.split(text, &SEPARATORS)
}

struct Splitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Splitter {
    fn split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let no_separators: &[&str] = &[];
        let (pieces, finer, last_resort) = match separators.iter().position(|s| text.contains(s)) {
            Some(idx) => (
                text.split_inclusive(separators[idx]).collect::<Vec<_>>(),
                &separators[idx + 1..],
                false,
            ),
            None => (text.graphemes(true).collect::<Vec<_>>(), no_separators, true),
        };

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(self.merge(&small));
                small.clear();
            }

            if last_resort {
                push_trimmed(&mut chunks, piece);
            } else {
                chunks.extend(self.split(piece, finer));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge(&small));
        }

        chunks
    }

    /// Pack pieces shorter than `chunk_size` into overlapping windows
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &window.iter().copied().collect::<String>());

                // Keep at most `chunk_overlap` characters, and enough room for the next piece
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(&mut chunks, &window.iter().copied().collect::<String>());
        }

        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
