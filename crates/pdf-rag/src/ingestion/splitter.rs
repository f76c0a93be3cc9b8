//! Token-bounded text splitting with sentence-break preference

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// Characters that end a sentence or paragraph
const SENTENCE_BREAKS: [char; 4] = ['.', '!', '?', '\n'];

fn is_whitespace(segment: &str) -> bool {
    segment.chars().all(char::is_whitespace)
}

/// Count tokens in `text`
///
/// A token is a Unicode word-boundary segment that is not pure whitespace,
/// so words, numbers and punctuation marks each count once.
pub fn count_tokens(text: &str) -> usize {
    text.split_word_bounds().filter(|s| !is_whitespace(s)).count()
}

/// A chunk's byte range before it becomes a [`Chunk`]
#[derive(Debug, Clone, Copy)]
struct Window {
    start: usize,
    end: usize,
}

/// Splits documents into chunks of at most `chunk_size` tokens
pub struct TokenTextSplitter {
    chunk_size: usize,
    min_chunk_size_chars: usize,
    max_num_chunks: usize,
}

impl TokenTextSplitter {
    /// Create a splitter from configuration
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            min_chunk_size_chars: config.min_chunk_size_chars,
            max_num_chunks: config.max_num_chunks,
        }
    }

    /// Token budget per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split every document, preserving document order
    pub fn split(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for document in documents {
            chunks.extend(self.split_document(document)?);
        }
        tracing::info!("Split {} documents into {} chunks", documents.len(), chunks.len());
        Ok(chunks)
    }

    /// Split a single document
    pub fn split_document(&self, document: &Document) -> Result<Vec<Chunk>> {
        if self.chunk_size == 0 {
            return Err(Error::split("chunk_size must be greater than 0"));
        }
        if self.max_num_chunks == 0 {
            return Err(Error::split("max_num_chunks must be greater than 0"));
        }
        if document.content.contains('\0') {
            return Err(Error::split(format!(
                "document {} contains NUL characters",
                document.id
            )));
        }
        if document.is_blank() {
            return Ok(Vec::new());
        }

        let windows = self.windows(&document.content);

        Ok(windows
            .into_iter()
            .enumerate()
            .map(|(index, w)| Chunk::new(document, index as u32, w.start, w.end))
            .collect())
    }

    /// Compute contiguous windows covering `text`
    fn windows(&self, text: &str) -> Vec<Window> {
        let segments: Vec<(usize, &str)> = text.split_word_bound_indices().collect();
        let byte_at = |index: usize| segments.get(index).map_or(text.len(), |(pos, _)| *pos);

        let mut windows: Vec<Window> = Vec::new();
        let mut next = 0usize;

        while next < segments.len() {
            if windows.len() >= self.max_num_chunks {
                tracing::warn!(
                    "Reached max_num_chunks ({}); {} bytes left unsplit",
                    self.max_num_chunks,
                    text.len() - byte_at(next)
                );
                break;
            }

            let start = next;
            let mut end = start;
            let mut tokens = 0usize;
            // Whitespace is free; stop at the first token past the budget
            while end < segments.len() {
                let segment = segments[end].1;
                if !is_whitespace(segment) {
                    if tokens == self.chunk_size {
                        break;
                    }
                    tokens += 1;
                }
                end += 1;
            }

            if end < segments.len() {
                if let Some(cut) = self.sentence_cut(&segments, start, end, byte_at(start)) {
                    end = cut;
                }
            }

            windows.push(Window {
                start: byte_at(start),
                end: byte_at(end),
            });
            next = end;
        }

        windows
    }

    /// Last sentence break in `segments[start..end]` lying past the minimum size
    ///
    /// Returns the segment index just after the break.
    fn sentence_cut(
        &self,
        segments: &[(usize, &str)],
        start: usize,
        end: usize,
        start_byte: usize,
    ) -> Option<usize> {
        let index = (start..end)
            .rev()
            .find(|&i| segments[i].1.ends_with(&SENTENCE_BREAKS[..]))?;

        let (pos, segment) = segments[index];
        let cut_byte = pos + segment.len();
        if cut_byte - start_byte <= self.min_chunk_size_chars {
            return None;
        }
        Some(index + 1)
    }
}
