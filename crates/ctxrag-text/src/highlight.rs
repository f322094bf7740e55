use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use ctxrag_core::tokenize::tokenize;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!]\s+").expect("sentence end pattern"));

/// Splits after `.`, `?` or `!` when whitespace follows. The punctuation stays
/// with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let text = text.trim();
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        // the terminator is one ASCII byte
        sentences.push(&text[start..=m.start()]);
        start = m.end();
    }
    sentences.push(&text[start..]);
    sentences.retain(|s| !s.is_empty());
    sentences
}

/// Up to `max_sentences` sentences of `text` sharing tokens with `query`,
/// best first. A sentence scores `overlap / sqrt(distinct tokens)`.
pub fn relevant_sentences(text: &str, query: &str, max_sentences: usize) -> Vec<String> {
    let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();
    let mut scored: Vec<(&str, f64)> = split_sentences(text)
        .into_iter()
        .filter_map(|sentence| {
            let tokens: HashSet<String> = tokenize(sentence).into_iter().collect();
            if tokens.is_empty() {
                return None;
            }
            let overlap = tokens.intersection(&query_tokens).count();
            if overlap == 0 {
                return None;
            }
            Some((sentence, overlap as f64 / (tokens.len() as f64).sqrt()))
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(max_sentences).map(|(s, _)| s.to_string()).collect()
}
