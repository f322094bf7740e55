use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use ctxrag_core::config::IdfScheme;
use ctxrag_core::types::Chunk;

/// Sparse TF-IDF vector. Tokens with zero weight are absent. Ordered so that
/// sums over a vector are evaluated in the same order for equal vectors.
pub type TermVector = BTreeMap<String, f64>;

/// Corpus-wide term statistics, built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Index {
    scheme: IdfScheme,
    chunk_count: usize,
    total_tokens: usize,
    document_frequency: HashMap<String, usize>,
    inverse_document_frequency: HashMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexStats {
    pub chunks: usize,
    pub vocabulary: usize,
    pub avg_tokens_per_chunk: f64,
    pub idf_scheme: IdfScheme,
}

impl Index {
    pub fn build(chunks: &[Chunk], scheme: IdfScheme) -> Self {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut total_tokens = 0usize;
        for chunk in chunks {
            total_tokens += chunk.tokens.len();
            let unique: HashSet<&str> = chunk.tokens.iter().map(String::as_str).collect();
            for token in unique {
                *document_frequency.entry(token.to_string()).or_insert(0) += 1;
            }
        }

        let n = chunks.len();
        let inverse_document_frequency = document_frequency
            .iter()
            .map(|(token, &d)| (token.clone(), idf_weight(scheme, n, d)))
            .collect();

        Self { scheme, chunk_count: n, total_tokens, document_frequency, inverse_document_frequency }
    }

    /// Number of chunks containing `token` at least once.
    pub fn document_frequency(&self, token: &str) -> usize {
        self.document_frequency.get(token).copied().unwrap_or(0)
    }

    /// IDF weight of `token`; `0.0` for tokens never seen in the corpus.
    pub fn idf(&self, token: &str) -> f64 {
        self.inverse_document_frequency.get(token).copied().unwrap_or(0.0)
    }

    /// Term frequency times IDF for every known token of `tokens`.
    pub fn vectorize(&self, tokens: &[String]) -> TermVector {
        term_frequency(tokens)
            .into_iter()
            .map(|(token, tf)| {
                let weight = tf * self.idf(token);
                (token, weight)
            })
            .filter(|&(_, weight)| weight > 0.0)
            .map(|(token, weight)| (token.to_string(), weight))
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        let avg_tokens_per_chunk = if self.chunk_count == 0 {
            0.0
        } else {
            self.total_tokens as f64 / self.chunk_count as f64
        };
        IndexStats {
            chunks: self.chunk_count,
            vocabulary: self.inverse_document_frequency.len(),
            avg_tokens_per_chunk,
            idf_scheme: self.scheme,
        }
    }
}

/// Smoothed IDF for a token in `d` of `n` chunks. Positive for every
/// `d <= n` and strictly decreasing in `d` under both schemes.
pub fn idf_weight(scheme: IdfScheme, n: usize, d: usize) -> f64 {
    let n = n as f64;
    let d = d as f64;
    match scheme {
        IdfScheme::Smoothed => ((n + 1.0) / (d + 0.5)).ln() + 1.0,
        IdfScheme::Bm25 => ((n - d + 0.5) / (d + 0.5) + 1.0).ln(),
    }
}

/// Occurrence counts normalized by the token count, so the values sum to 1.
/// An empty token list yields an empty map.
pub fn term_frequency(tokens: &[String]) -> BTreeMap<&str, f64> {
    let mut counts: BTreeMap<&str, f64> = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    let total = if tokens.is_empty() { 1.0 } else { tokens.len() as f64 };
    for value in counts.values_mut() {
        *value /= total;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts.iter().enumerate().map(|(i, t)| Chunk::new(i, *t)).collect()
    }

    #[test]
    fn document_frequency_counts_once_per_chunk() {
        let index = Index::build(&chunks(&["rce rce rce", "rce sqli", "xss"]), IdfScheme::Smoothed);
        assert_eq!(index.document_frequency("rce"), 2);
        assert_eq!(index.document_frequency("sqli"), 1);
        assert_eq!(index.document_frequency("missing"), 0);
    }

    #[test]
    fn smoothed_weight_matches_formula() {
        let index = Index::build(&chunks(&["a b", "a", "c"]), IdfScheme::Smoothed);
        let expected = (4.0f64 / 2.5).ln() + 1.0;
        assert!((index.idf("a") - expected).abs() < 1e-12);
    }

    #[test]
    fn bm25_weight_matches_formula() {
        let index = Index::build(&chunks(&["a b", "a", "c"]), IdfScheme::Bm25);
        let expected = ((3.0f64 - 2.0 + 0.5) / 2.5 + 1.0).ln();
        assert!((index.idf("a") - expected).abs() < 1e-12);
    }

    #[test]
    fn rarer_tokens_weigh_more() {
        let index = Index::build(&chunks(&["common rare", "common", "common"]), IdfScheme::Smoothed);
        assert!(index.idf("rare") > index.idf("common"));
    }

    #[test]
    fn term_frequency_sums_to_one() {
        let tokens: Vec<String> = ["a", "b", "a", "c"].iter().map(|s| s.to_string()).collect();
        let tf = term_frequency(&tokens);
        assert!((tf["a"] - 0.5).abs() < 1e-12);
        assert!((tf.values().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(term_frequency(&[]).is_empty());
    }

    #[test]
    fn unknown_query_tokens_are_absent() {
        let index = Index::build(&chunks(&["openssl heartbeat"]), IdfScheme::Smoothed);
        let tokens: Vec<String> = ["openssl", "phpmailer"].iter().map(|s| s.to_string()).collect();
        let vector = index.vectorize(&tokens);
        assert_eq!(vector.len(), 1);
        assert!(vector.contains_key("openssl"));
        assert!(index.vectorize(&[]).is_empty());
    }

    #[test]
    fn stats_report_corpus_shape() {
        let index = Index::build(&chunks(&["a b c", "a"]), IdfScheme::Bm25);
        let stats = index.stats();
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.vocabulary, 3);
        assert!((stats.avg_tokens_per_chunk - 2.0).abs() < 1e-12);
        assert_eq!(stats.idf_scheme, IdfScheme::Bm25);
    }

    mod props {
        use super::super::idf_weight;
        use ctxrag_core::config::IdfScheme;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn idf_positive_and_strictly_decreasing(n in 1usize..5000, a in 0usize..5000, b in 0usize..5000) {
                let (x, y) = (a % (n + 1), b % (n + 1));
                let (lo, hi) = (x.min(y), x.max(y));
                for scheme in [IdfScheme::Smoothed, IdfScheme::Bm25] {
                    prop_assert!(idf_weight(scheme, n, lo) > 0.0);
                    prop_assert!(idf_weight(scheme, n, hi) > 0.0);
                    if lo < hi {
                        prop_assert!(idf_weight(scheme, n, lo) > idf_weight(scheme, n, hi));
                    }
                }
            }
        }
    }
}
