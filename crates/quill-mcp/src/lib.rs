//! quill-mcp: Model Context Protocol client used to pull external tools
//! into the agent's tool registry.

mod client;
mod config;
mod error;
mod http;
mod stdio;

pub use client::{McpClient, McpToolCallResult, McpToolInfo};
pub use config::{
    discover_server, load_server_config, server_config_from_env, strip_json_comments,
    ServerConfig, TransportConfig, DEFAULT_CONFIG_FILE,
};
pub use error::McpError;
