//! Error types for the conversational ordering engine.

use thali_core::error::ThaliError;

/// Errors from the chat engine.
///
/// `Llm` and `LlmTimeout` are produced by [`LlmClient`](crate::llm::LlmClient)
/// implementations and recovered inside the orchestrator; callers of a turn
/// only ever see the remaining variants.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("menu has not been processed yet")]
    MenuNotProcessed,
    #[error("search error: {0}")]
    Search(String),
    #[error("LLM error: {0}")]
    Llm(String),
    #[error("LLM call timed out after {0} seconds")]
    LlmTimeout(u64),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ThaliError> for ChatError {
    fn from(err: ThaliError) -> Self {
        match err {
            ThaliError::IndexNotBuilt => ChatError::MenuNotProcessed,
            ThaliError::Embedding(msg) => ChatError::Embedding(msg),
            ThaliError::Config(msg) => ChatError::Config(msg),
            other => ChatError::Search(other.to_string()),
        }
    }
}

/// Request URLs may carry credentials, so they are dropped from the message.
impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Llm(err.without_url().to_string())
    }
}
