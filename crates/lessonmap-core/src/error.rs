//! Error types for LessonMap.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Every JSON extraction strategy failed. `excerpt` holds the start of the
    /// cleaned text for diagnostics.
    #[error("Parse error: {message} (excerpt: {excerpt:?})")]
    Parse { message: String, excerpt: String },

    #[error("Invalid mind map structure: {0}")]
    StructuralInvalid(String),

    #[error("Generation error: {0}")]
    Generation(String),

    /// No chunk produced a usable tree.
    #[error("Mind map generation failed: {0}")]
    GenerationFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate content: hash={0}")]
    DuplicateContent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a parse error, keeping at most `EXCERPT_CHARS` characters of the
    /// offending text.
    pub fn parse(message: impl Into<String>, text: &str) -> Self {
        const EXCERPT_CHARS: usize = 200;
        Error::Parse {
            message: message.into(),
            excerpt: text.chars().take(EXCERPT_CHARS).collect(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
