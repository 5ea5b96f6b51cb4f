//! SavePlan / WritePlan: store a markdown plan under `plans/`.

use crate::error::ToolError;
use crate::traits::{schema_for, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const PLANS_DIR: &str = "plans";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PlanParams {
    /// Detailed plan in markdown.
    pub content: String,
    /// Title of the plan.
    pub title: String,
}

/// Writes `plans/<title>.md`. Registered twice, as `SavePlan` and `WritePlan`.
pub struct PlanWriter {
    name: &'static str,
    label: &'static str,
    description: &'static str,
}

impl PlanWriter {
    pub fn save_plan() -> Self {
        Self {
            name: "SavePlan",
            label: "Save Plan",
            description: "Save the plan to a markdown file",
        }
    }

    pub fn write_plan() -> Self {
        Self {
            name: "WritePlan",
            label: "Write Plan",
            description: "Write the plan to a markdown file",
        }
    }
}

fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Plan title must not be empty".to_string());
    }
    if title.contains(['/', '\\']) || title.contains("..") {
        return Err(format!(
            "Invalid plan title '{title}': must not contain path separators or '..'"
        ));
    }
    Ok(())
}

#[async_trait]
impl Tool for PlanWriter {
    fn name(&self) -> &str {
        self.name
    }
    fn label(&self) -> &str {
        self.label
    }
    fn description(&self) -> &str {
        self.description
    }
    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<PlanParams>()
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: PlanParams = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;
        if let Err(message) = validate_title(&params.title) {
            return Ok(ToolResult::error(message));
        }

        let filename = format!("{PLANS_DIR}/{}.md", params.title);
        tracing::info!(%filename, "saving plan");

        let dir = ctx.working_dir.join(PLANS_DIR);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            return Ok(ToolResult::error(e.to_string()));
        }
        let path = dir.join(format!("{}.md", params.title));
        if let Err(e) = tokio::fs::write(&path, &params.content).await {
            return Ok(ToolResult::error(e.to_string()));
        }

        Ok(ToolResult::success(serde_json::json!({
            "success": true,
            "filename": filename,
        })))
    }
}
