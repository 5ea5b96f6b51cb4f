//! Error types for the quill-mcp crate.

/// Errors returned by the MCP client.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("MCP server '{0}' closed the connection")]
    ConnectionClosed(String),
    #[error("MCP server '{server}' returned protocol error {code}: {message}")]
    ServerError {
        server: String,
        code: i64,
        message: String,
    },
    #[error("MCP server '{server}' sent invalid response: {message}")]
    InvalidResponse { server: String, message: String },
    #[error("MCP request to server '{server}' timed out after {seconds}s")]
    Timeout { server: String, seconds: u64 },
    #[error("MCP server '{0}' is unusable after an interrupted request")]
    Broken(String),
    #[error("Failed to spawn MCP server '{server}': {message}")]
    Spawn { server: String, message: String },
    #[error("IO error while talking to MCP server '{server}': {message}")]
    Io { server: String, message: String },
    #[error("HTTP error while talking to MCP server '{server}': {message}")]
    Http { server: String, message: String },
    #[error("JSON error while talking to MCP server '{server}': {message}")]
    Json { server: String, message: String },
    #[error("Invalid MCP configuration: {0}")]
    InvalidConfig(String),
}
