//! Error types for sensei-embed.

/// Errors from embedding or rerank collaborators.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed JSON in a provider response.
    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider returned a response with no embedding data.
    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    /// Generic catch-all error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using `EmbedError`.
pub type Result<T> = std::result::Result<T, EmbedError>;
