//! Error types for the quill-tools crate.

/// Errors that can occur during tool execution.
///
/// The dispatcher turns any of these into an `{"error": ...}` result, so
/// they never reach the conversation loop.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid parameters passed to tool
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Tool execution failed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// The remote MCP server failed the call
    #[error(transparent)]
    Mcp(#[from] quill_mcp::McpError),

    /// I/O error during tool execution
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from registry and active-set bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateName(String),

    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Tool {0} is already active")]
    AlreadyActive(String),
}
