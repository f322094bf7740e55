use crate::types::{Chunk, ChunkId, SearchHit};

/// Ranks corpus chunks against a free-text query.
///
/// Implementations are immutable after construction so a single instance can
/// serve concurrent queries.
pub trait Retriever: Send + Sync {
    /// Hits in descending score order, at most `top_k`, scores in `(0, 1]`.
    fn retrieve(&self, query: &str, top_k: usize) -> Vec<SearchHit>;

    fn chunk(&self, id: ChunkId) -> Option<&Chunk>;
}
