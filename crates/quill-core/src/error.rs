//! Error types for the quill-core crate.

/// Core error type for session setup and bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum QuillError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Tool registration failed
    #[error(transparent)]
    Registry(#[from] quill_tools::RegistryError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}
