//! ctxrag-text
//!
//! TF-IDF retrieval over an in-memory corpus: `index` builds term statistics,
//! `search` ranks chunks by cosine similarity, `extract` cuts the marked
//! section out of the best chunks, and `engine` ties them together.
pub mod engine;
pub mod extract;
pub mod highlight;
pub mod index;
pub mod search;
pub mod shared;

pub use engine::{ContextEngine, Highlight};
pub use extract::AnswerExtractor;
pub use index::{Index, IndexStats, TermVector};
pub use search::Ranker;
pub use shared::SharedEngine;
