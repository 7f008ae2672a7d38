//! Error types for Svar.

use thiserror::Error;

/// Library-level error type for Svar operations.
///
/// Retrieval and search failures are recoverable: the workflow absorbs them
/// into an empty evidence set and keeps moving. Synthesis failure is fatal to
/// the query. Speech failure withholds audio but never invalidates an answer.
#[derive(Error, Debug)]
pub enum SvarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vector index unavailable: {0}")]
    Retrieval(String),

    #[error("Web search unavailable: {0}")]
    Search(String),

    #[error("Sufficiency evaluation failed: {0}")]
    Evaluation(String),

    #[error("Answer synthesis failed: {0}")]
    Synthesis(String),

    #[error("Speech rendering unavailable: {0}")]
    Speech(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Svar operations.
pub type Result<T> = std::result::Result<T, SvarError>;
