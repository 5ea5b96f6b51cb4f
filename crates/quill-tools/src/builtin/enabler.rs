//! Enabler: lets the model switch on registered but inactive tools.

use crate::error::ToolError;
use crate::manager::{SessionContext, ToolManager};
use crate::traits::{schema_for, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EnablerParams {
    /// Tool name to enable.
    pub tool: String,
}

pub struct Enabler {
    tools: ToolManager,
    description: String,
}

impl Enabler {
    /// Bind to the session's tool manager. The description lists the tools
    /// that are inactive right now.
    pub fn new(ctx: &SessionContext) -> Self {
        let inactive = ctx.tools.inactive_names();
        let description = if inactive.is_empty() {
            "Enables a tool based on the request. All tools are already active.".to_string()
        } else {
            format!(
                "Enables a tool based on the request. Tools that can be enabled: {}.",
                inactive.join(", ")
            )
        };
        Self {
            tools: ctx.tools.clone(),
            description,
        }
    }
}

#[async_trait]
impl Tool for Enabler {
    fn name(&self) -> &str {
        "Enabler"
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<EnablerParams>()
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: EnablerParams = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;

        match self.tools.activate(&params.tool) {
            Ok(()) => {
                tracing::info!(tool = %params.tool, "enabled tool on request");
                Ok(ToolResult::success(serde_json::json!({ "success": true })))
            }
            Err(err) => Ok(ToolResult::error(err.to_string())),
        }
    }
}
