//! Error types for ragline.
//!
//! This module defines a unified error enum covering every error category
//! in the workspace: configuration, I/O, LLM providers, retrieval, history,
//! blob storage, web search and prompts.

use thiserror::Error;

/// Unified error type for ragline.
///
/// Library crates may define narrower error enums (for example the retrieval
/// engine's `RetrievalError`), but they all convert into `AppError` at the
/// crate boundary.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding, indexing and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Conversation history errors
    #[error("History error: {0}")]
    History(String),

    /// Blob storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Web search errors
    #[error("Search error: {0}")]
    Search(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
