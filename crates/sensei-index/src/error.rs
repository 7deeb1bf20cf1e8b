//! Error types for sensei-index.

/// Errors that can occur during index builds or retrieval.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading source files or persisted artifacts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedding or rerank collaborator failure.
    #[error("embedding error: {0}")]
    Embed(#[from] sensei_embed::EmbedError),

    /// Index or metadata artifact missing; the message names the
    /// build step to run.
    #[error("{0}")]
    MissingArtifact(String),

    /// Vector dimensionality disagreement between index and query.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Generic catch-all error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
