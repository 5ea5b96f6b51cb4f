//! MCP server discovery from `mcp.json` or the environment.

use crate::error::McpError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "mcp.json";

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// How to reach an MCP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// Spawn a child process and speak JSON-RPC over its stdio.
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
        cwd: Option<PathBuf>,
    },
    /// POST JSON-RPC messages to a streamable HTTP endpoint.
    Http { url: String },
}

/// A resolved MCP server definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server label, used in logs and error messages.
    pub name: String,
    pub transport: TransportConfig,
    pub startup_timeout: Duration,
    pub tool_timeout: Duration,
}

impl ServerConfig {
    fn new(name: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            name: name.into(),
            transport,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct McpFile {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ServerEntry {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    cwd: Option<PathBuf>,
}

/// Remove `//` line comments that sit outside of JSON string literals.
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '/' if chars.peek() == Some(&'/') => {
                // Drop everything up to (not including) the newline.
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Load the first server under `mcpServers` from a JSON config file.
///
/// Returns `Ok(None)` when the file does not exist or declares no servers.
pub fn load_server_config(path: &Path) -> Result<Option<ServerConfig>, McpError> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path).map_err(|e| {
        McpError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
    })?;
    let file: McpFile = serde_json::from_str(&strip_json_comments(&raw)).map_err(|e| {
        McpError::InvalidConfig(format!("error parsing {}: {e}", path.display()))
    })?;

    let Some((name, entry)) = file.mcp_servers.into_iter().next() else {
        return Ok(None);
    };
    let entry: ServerEntry = serde_json::from_value(entry)
        .map_err(|e| McpError::InvalidConfig(format!("server '{name}': {e}")))?;

    let transport = if let Some(url) = entry.url.filter(|u| !u.trim().is_empty()) {
        TransportConfig::Http { url }
    } else if let Some(command) = entry.command.filter(|c| !c.trim().is_empty()) {
        let cwd = entry.cwd.map(|cwd| {
            if cwd.is_relative() {
                path.parent().unwrap_or(Path::new(".")).join(cwd)
            } else {
                cwd
            }
        });
        TransportConfig::Stdio {
            command,
            args: entry.args,
            env: entry.env,
            cwd,
        }
    } else {
        return Err(McpError::InvalidConfig(format!(
            "server '{name}' needs either a `url` or a `command`"
        )));
    };

    Ok(Some(ServerConfig::new(name, transport)))
}

/// Build a server definition from `MCP_SERVER_URL`, or from
/// `MCP_SERVER_COMMAND` plus whitespace-separated `MCP_SERVER_ARGS`.
pub fn server_config_from_env<F>(lookup: F) -> Option<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty("MCP_SERVER_URL") {
        return Some(ServerConfig::new("env", TransportConfig::Http { url }));
    }

    let command = non_empty("MCP_SERVER_COMMAND")?;
    let args = non_empty("MCP_SERVER_ARGS")
        .map(|args| args.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    Some(ServerConfig::new(
        "env",
        TransportConfig::Stdio {
            command,
            args,
            env: HashMap::new(),
            cwd: None,
        },
    ))
}

/// Find an MCP server: the config file first, then the environment.
///
/// Configuration problems are logged and treated as "no server".
pub fn discover_server(config_path: Option<&Path>, cwd: &Path) -> Option<ServerConfig> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_FILE));

    match load_server_config(&path) {
        Ok(Some(config)) => return Some(config),
        Ok(None) => {
            tracing::debug!(path = %path.display(), "no MCP server in config file");
        }
        Err(err) => {
            tracing::warn!(error = %err, "ignoring MCP config file");
        }
    }

    server_config_from_env(|key| std::env::var(key).ok())
}
