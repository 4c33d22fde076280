use thiserror::Error;

/// Top-level error type for the thali engine.
///
/// Subsystem crates define their own error types and implement
/// `From<ThaliError>` so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThaliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Retrieval index has not been built")]
    IndexNotBuilt,

    #[error("Search error: {0}")]
    Search(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),
}

impl From<toml::de::Error> for ThaliError {
    fn from(err: toml::de::Error) -> Self {
        ThaliError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ThaliError {
    fn from(err: toml::ser::Error) -> Self {
        ThaliError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ThaliError {
    fn from(err: serde_json::Error) -> Self {
        ThaliError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for thali operations.
pub type Result<T> = std::result::Result<T, ThaliError>;
