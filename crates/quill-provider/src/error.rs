//! Error types for the quill-provider crate.

/// Errors that can occur in chat backend operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error: {0}")]
    ApiError(String),

    /// Invalid model specified
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),
}
