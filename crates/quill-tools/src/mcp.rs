//! Tools served by a remote MCP server.

use crate::error::ToolError;
use crate::manager::ToolManager;
use crate::traits::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use quill_mcp::{McpClient, McpError, McpToolInfo, ServerConfig};
use serde_json::Value;
use std::sync::Arc;

/// Connect to `config`, then register and enable every tool it offers
/// under its remote name.
///
/// Names that collide with an existing registration are skipped with a
/// warning. Returns the names that were added.
pub async fn load_mcp_tools(
    manager: &ToolManager,
    config: ServerConfig,
) -> Result<Vec<String>, McpError> {
    let (client, tools) = McpClient::connect(config).await?;
    Ok(register_mcp_tools(manager, Arc::new(client), tools))
}

/// Register already discovered MCP tools and enable them.
pub fn register_mcp_tools(
    manager: &ToolManager,
    client: Arc<McpClient>,
    tools: Vec<McpToolInfo>,
) -> Vec<String> {
    let mut added = Vec::new();
    for info in tools {
        let name = info.name.clone();
        let tool = McpTool {
            info,
            client: Arc::clone(&client),
        };
        if let Err(err) = manager.register_tool(Arc::new(tool)) {
            tracing::warn!(tool = %name, error = %err, "skipping MCP tool");
            continue;
        }
        manager.enable(&name);
        added.push(name);
    }
    added
}

struct McpTool {
    info: McpToolInfo,
    client: Arc<McpClient>,
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn description(&self) -> &str {
        &self.info.description
    }

    fn parameters_schema(&self) -> Value {
        self.info.input_schema.clone()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        tracing::debug!(
            server = self.client.server_name(),
            tool = %self.info.name,
            "calling MCP tool"
        );
        let result = self.client.call_tool(&self.info.name, args).await?;
        if result.is_error {
            return Ok(ToolResult::error(result.text));
        }
        Ok(ToolResult::success(result.text))
    }
}
