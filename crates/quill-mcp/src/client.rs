//! Transport-independent MCP client: handshake, tool discovery and calls.

use crate::config::{ServerConfig, TransportConfig};
use crate::error::McpError;
use crate::http::HttpTransport;
use crate::stdio::StdioTransport;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// One JSON-RPC channel to an MCP server.
#[async_trait]
pub(crate) trait Transport: Send + Sync {
    /// Send a request and wait for the matching response's `result`.
    async fn request(&self, method: &str, params: Value, timeout: Duration)
        -> Result<Value, McpError>;

    /// Send a notification (no response expected).
    async fn notify(&self, method: &str, params: Value) -> Result<(), McpError>;

    fn server_name(&self) -> &str;
}

/// Metadata returned by an MCP server for one tool.
#[derive(Debug, Clone)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Normalized result returned from an MCP tool call.
#[derive(Debug, Clone)]
pub struct McpToolCallResult {
    pub text: String,
    pub structured_content: Option<Value>,
    pub raw_content: Vec<Value>,
    pub is_error: bool,
}

/// Connected MCP client. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct McpClient {
    transport: Arc<dyn Transport>,
    tool_timeout: Duration,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("server", &self.transport.server_name())
            .field("tool_timeout", &self.tool_timeout)
            .finish()
    }
}

impl McpClient {
    /// Open the configured transport, run the handshake and list tools.
    pub async fn connect(config: ServerConfig) -> Result<(Self, Vec<McpToolInfo>), McpError> {
        let transport: Arc<dyn Transport> = match &config.transport {
            TransportConfig::Stdio {
                command,
                args,
                env,
                cwd,
            } => Arc::new(StdioTransport::spawn(
                &config.name,
                command,
                args,
                env,
                cwd.as_deref(),
            )?),
            TransportConfig::Http { url } => Arc::new(HttpTransport::new(&config.name, url)?),
        };

        let client = Self {
            transport,
            tool_timeout: config.tool_timeout,
        };
        client.initialize(config.startup_timeout).await?;
        let tools = client.list_tools(config.startup_timeout).await?;
        tracing::info!(
            server = %config.name,
            tools = tools.len(),
            "connected to MCP server"
        );
        Ok((client, tools))
    }

    pub fn server_name(&self) -> &str {
        self.transport.server_name()
    }

    /// Call one tool on the connected MCP server.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<McpToolCallResult, McpError> {
        let result = self
            .transport
            .request(
                "tools/call",
                json!({ "name": name, "arguments": arguments }),
                self.tool_timeout,
            )
            .await?;

        let content = result
            .get("content")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let structured_content = result.get("structuredContent").cloned();
        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(McpToolCallResult {
            text: render_content_text(&content, structured_content.as_ref()),
            structured_content,
            raw_content: content,
            is_error,
        })
    }

    async fn initialize(&self, timeout: Duration) -> Result<(), McpError> {
        self.transport
            .request(
                "initialize",
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "quill",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
                timeout,
            )
            .await?;
        self.transport
            .notify("notifications/initialized", json!({}))
            .await
    }

    async fn list_tools(&self, timeout: Duration) -> Result<Vec<McpToolInfo>, McpError> {
        let server_name = self.transport.server_name().to_string();
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.transport.request("tools/list", params, timeout).await?;
            let listed = result
                .get("tools")
                .and_then(Value::as_array)
                .ok_or_else(|| McpError::InvalidResponse {
                    server: server_name.clone(),
                    message: "tools/list result missing tools array".to_string(),
                })?;

            for tool in listed {
                tools.push(parse_tool_info(&server_name, tool)?);
            }

            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(ToString::to_string);
            if cursor.is_none() {
                break;
            }
        }
        Ok(tools)
    }
}

/// Pick the response for `request_id` out of a JSON-RPC message, if it is one.
///
/// Returns `None` for notifications, server requests and other ids.
pub(crate) fn match_response(
    server_name: &str,
    message: &Value,
    request_id: u64,
) -> Option<Result<Value, McpError>> {
    if message.get("method").is_some() {
        return None;
    }
    if message.get("id").and_then(Value::as_u64) != Some(request_id) {
        return None;
    }

    if let Some(err) = message.get("error") {
        return Some(Err(McpError::ServerError {
            server: server_name.to_string(),
            code: err.get("code").and_then(Value::as_i64).unwrap_or(-32000),
            message: err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        }));
    }
    Some(Ok(message.get("result").cloned().unwrap_or(Value::Null)))
}

fn parse_tool_info(server_name: &str, value: &Value) -> Result<McpToolInfo, McpError> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::InvalidResponse {
            server: server_name.to_string(),
            message: "tool entry missing name".to_string(),
        })?;
    Ok(McpToolInfo {
        name: name.to_string(),
        description: value
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("MCP tool")
            .to_string(),
        input_schema: value
            .get("inputSchema")
            .cloned()
            .unwrap_or_else(|| json!({"type": "object", "additionalProperties": true})),
    })
}

fn render_content_text(content: &[Value], structured_content: Option<&Value>) -> String {
    let mut parts = Vec::new();
    for item in content {
        match item.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = item.get("text").and_then(Value::as_str) {
                    parts.push(text.to_string());
                }
            }
            Some("resource") => match item
                .get("resource")
                .and_then(|r| r.get("text"))
                .and_then(Value::as_str)
            {
                Some(text) => parts.push(text.to_string()),
                None => parts.push("[resource content omitted]".to_string()),
            },
            Some(kind) => parts.push(format!("[{kind} content omitted]")),
            None => {}
        }
    }

    if !parts.is_empty() {
        return parts.join("\n");
    }
    match structured_content {
        Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        None => "(no output)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_text_and_omitted_content() {
        let content = vec![
            json!({"type": "text", "text": "first"}),
            json!({"type": "image", "data": "..."}),
            json!({"type": "resource", "resource": {"text": "from resource"}}),
        ];
        assert_eq!(
            render_content_text(&content, None),
            "first\n[image content omitted]\nfrom resource"
        );
    }

    #[test]
    fn test_render_falls_back_to_structured_content() {
        let structured = json!({"answer": 42});
        let text = render_content_text(&[], Some(&structured));
        assert!(text.contains("\"answer\": 42"));
        assert_eq!(render_content_text(&[], None), "(no output)");
    }

    #[test]
    fn test_parse_tool_info_defaults() {
        let info = parse_tool_info("srv", &json!({"name": "search"})).unwrap();
        assert_eq!(info.name, "search");
        assert_eq!(info.description, "MCP tool");
        assert_eq!(info.input_schema["type"], "object");

        assert!(parse_tool_info("srv", &json!({"description": "x"})).is_err());
    }

    #[test]
    fn test_match_response_skips_other_messages() {
        let notification = json!({"jsonrpc": "2.0", "method": "notifications/progress"});
        assert!(match_response("srv", &notification, 1).is_none());

        let other = json!({"jsonrpc": "2.0", "id": 7, "result": {}});
        assert!(match_response("srv", &other, 1).is_none());

        let ours = json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}});
        let result = match_response("srv", &ours, 1).unwrap().unwrap();
        assert_eq!(result["ok"], true);
    }

    #[test]
    fn test_match_response_maps_errors() {
        let message = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {"code": -32602, "message": "bad params"}
        });
        match match_response("srv", &message, 3).unwrap() {
            Err(McpError::ServerError { code, message, .. }) => {
                assert_eq!(code, -32602);
                assert_eq!(message, "bad params");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }
}
