//! Domain types used by the index, the ranker and the answer extractor.

use serde::{Deserialize, Serialize};

use crate::tokenize::tokenize;

/// Position of a chunk in corpus order. Equal scores rank by ascending id.
pub type ChunkId = usize;

/// An independently scored unit of corpus text.
///
/// - `id`: position in source order (paragraph, window or record order)
/// - `text`: the chunk payload as it will be previewed and extracted from
/// - `tokens`: `tokenize(text)`, kept so the index never re-tokenizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub tokens: Vec<String>,
}

impl Chunk {
    pub fn new(id: ChunkId, text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = tokenize(&text);
        Self { id, text, tokens }
    }
}

/// A ranked reference to a chunk. `score` is a cosine similarity in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f64,
}

/// How a query terminated. `NoContext` and `NoSection` leave the context empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Extracted,
    NoContext,
    NoSection,
    BudgetExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub score: f64,
    pub snippet: String,
}

/// Per-hit scores and previews in ranked order, recorded whether or not the
/// hit contributed an extracted section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugTrace {
    pub scores: Vec<TraceEntry>,
}

/// The result of a query. `answer` and `context` always hold the same text:
/// the engine returns the extracted excerpt, never a synthesized reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub outcome: AnswerOutcome,
    pub answer: String,
    pub context: String,
    pub debug: Option<DebugTrace>,
}

impl Answer {
    /// The trace as a JSON string (`{"scores":[...]}`), or `None` when debug
    /// output was not requested.
    pub fn debug_json(&self) -> Option<String> {
        self.debug
            .as_ref()
            .and_then(|trace| serde_json::to_string(trace).ok())
    }
}
