use std::cmp::Ordering;

use ctxrag_core::tokenize::tokenize;
use ctxrag_core::types::{Chunk, ChunkId, SearchHit};

use crate::index::{Index, TermVector};

/// Euclidean length of a sparse vector.
pub fn norm(v: &TermVector) -> f64 {
    v.values().map(|x| x * x).sum::<f64>().sqrt()
}

/// Sum of products over tokens present in both vectors, in token order.
pub fn dot(a: &TermVector, b: &TermVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(token, x)| large.get(token).map(|y| x * y))
        .sum()
}

/// Cosine similarity of two non-negative sparse vectors, in `[0, 1]`.
/// Empty or zero-length vectors have similarity `0.0`.
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f64 {
    cosine_with_norms(a, norm(a), b, norm(b))
}

fn cosine_with_norms(a: &TermVector, norm_a: f64, b: &TermVector, norm_b: f64) -> f64 {
    if a.is_empty() || b.is_empty() || norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot(a, b) / (norm_a * norm_b)).min(1.0)
}

#[derive(Debug, Clone)]
struct ChunkVector {
    id: ChunkId,
    weights: TermVector,
    norm: f64,
}

/// Scores queries against every chunk of an index.
///
/// Chunk vectors and their norms are computed once at construction; they are
/// the same values `Index::vectorize` returns for the chunk tokens.
#[derive(Debug, Clone)]
pub struct Ranker {
    index: Index,
    vectors: Vec<ChunkVector>,
}

impl Ranker {
    pub fn new(index: Index, chunks: &[Chunk]) -> Self {
        let vectors = chunks
            .iter()
            .map(|chunk| {
                let weights = index.vectorize(&chunk.tokens);
                let norm = norm(&weights);
                ChunkVector { id: chunk.id, weights, norm }
            })
            .collect();
        Self { index, vectors }
    }

    pub fn index(&self) -> &Index { &self.index }

    /// Top `top_k` chunks by cosine similarity to `query`, best first. Chunks
    /// without lexical overlap are excluded; equal scores keep corpus order.
    pub fn rank(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        if top_k == 0 {
            return Vec::new();
        }
        let query_vec = self.index.vectorize(&tokenize(query));
        if query_vec.is_empty() {
            return Vec::new();
        }
        let query_norm = norm(&query_vec);

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .filter_map(|cv| {
                let score = cosine_with_norms(&query_vec, query_norm, &cv.weights, cv.norm);
                (score > 0.0).then_some(SearchHit { id: cv.id, score })
            })
            .collect();
        // Vec::sort_by is stable: ties stay in corpus order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        hits
    }
}
