//! Splits corpus text into chunks.
//!
//! Paragraph mode cuts on blank lines and falls back to sliding windows for
//! paragraphs longer than `max_chunk_chars`. Window mode walks the whole text
//! in overlapping character windows. Record mode maps one record to one chunk.
//! All lengths are counted in characters, not bytes.
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::corpus::Record;
use crate::error::{Error, Result};
use crate::types::Chunk;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph break pattern"));
static TRAILING_BLANKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\n").expect("trailing blanks pattern"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkMode {
    #[default]
    Paragraph,
    Window,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub mode: ChunkMode,
    pub max_chunk_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { mode: ChunkMode::Paragraph, max_chunk_chars: 800, overlap_chars: 100 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_chars == 0 {
            return Err(Error::InvalidConfig("chunking.max_chunk_chars must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChunkBuilder {
    config: ChunkingConfig,
}

impl ChunkBuilder {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Raw chunk texts for one document, before tokenization.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let max = self.config.max_chunk_chars;
        let overlap = self.config.overlap_chars;
        match self.config.mode {
            ChunkMode::Window => sliding_windows(text, max, overlap),
            ChunkMode::Paragraph => {
                let mut pieces = Vec::new();
                for paragraph in split_paragraphs(text) {
                    if paragraph.chars().count() <= max {
                        pieces.push(paragraph);
                    } else {
                        pieces.extend(sliding_windows(&paragraph, max, overlap));
                    }
                }
                pieces
            }
        }
    }

    pub fn build_text(&self, text: &str) -> Vec<Chunk> {
        self.build_texts(std::iter::once(text))
    }

    /// Chunks several documents independently and numbers the result as one
    /// corpus, in input order.
    pub fn build_texts<'a, I>(&self, texts: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let pieces = texts.into_iter().flat_map(|text| self.split_text(text));
        number_chunks(pieces)
    }

    /// One chunk per record, never split and never dropped.
    pub fn build_records(&self, records: &[Record]) -> Vec<Chunk> {
        records.iter().enumerate().map(|(id, record)| Chunk::new(id, record.render())).collect()
    }
}

/// Tokenizes each piece, drops the ones without tokens, and assigns
/// consecutive ids to the survivors.
fn number_chunks<I>(pieces: I) -> Vec<Chunk>
where
    I: IntoIterator<Item = String>,
{
    let mut chunks = Vec::new();
    for text in pieces {
        let chunk = Chunk::new(chunks.len(), text);
        if !chunk.tokens.is_empty() {
            chunks.push(chunk);
        }
    }
    chunks
}

/// Splits on one or more blank lines. Paragraphs are trimmed and blanks
/// before inner newlines are removed.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK
        .split(text.trim())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| TRAILING_BLANKS.replace_all(p, "\n").into_owned())
        .collect()
}

/// Windows of `max_chunk_chars` characters; each next window starts
/// `max_chunk_chars - overlap_chars` characters later, and always at least one
/// character later. Windows are trimmed and empty ones discarded.
pub fn sliding_windows(text: &str, max_chunk_chars: usize, overlap_chars: usize) -> Vec<String> {
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;
    let window = max_chunk_chars.max(1);

    let mut windows = Vec::new();
    let mut start = 0usize;
    while start < total {
        let end = (start + window).min(total);
        let piece = text[bounds[start]..bounds[end]].trim();
        if !piece.is_empty() {
            windows.push(piece.to_owned());
        }
        if end == total {
            break;
        }
        start = end.saturating_sub(overlap_chars).max(start + 1);
    }
    windows
}
