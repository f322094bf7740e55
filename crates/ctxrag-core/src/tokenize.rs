//! Case-folded word tokenizer used for both chunks and queries.

/// Lowercases `text` and splits it on every run of characters that are not
/// letters, digits or `_`. Empty pieces are discarded.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !is_word_char(c))
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
