//! Errors raised by the embedding and retrieval core.

use ragline_core::AppError;
use thiserror::Error;

/// Failure of an embedding, indexing or retrieval operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    /// The embedding model could not be loaded; raised only at construction.
    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),

    /// A vector's length differs from the index dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An index was constructed for zero-length vectors.
    #[error("Invalid dimension: vectors need at least one component")]
    ZeroDimension,

    /// `k` must be at least 1.
    #[error("Invalid k: top-k must be greater than zero")]
    InvalidK,

    /// An embedding call failed after the model was loaded.
    #[error("Embedding failed: {0}")]
    Embedding(String),
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        AppError::Knowledge(err.to_string())
    }
}
