use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while building an engine. Per-query conditions are never
/// errors; they are reported through `AnswerOutcome`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Corpus not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {}: {source}", .path.display())]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a JSON array of records in {}", .0.display())]
    NotAnArray(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
