//! Empower: define a new tool at runtime from WebAssembly text.
//!
//! The operator must approve the source before anything is parsed or run.

use crate::dynamic::WasmToolLoader;
use crate::error::ToolError;
use crate::manager::{ApprovalGate, DynamicRegistration, SessionContext, ToolManager};
use crate::traits::{schema_for, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DESCRIPTION: &str = r#"Define a new tool from WebAssembly text (WAT) and add it to the chat.
The operator is asked to approve the source first.

The module runs sandboxed with no imports and must export:
- `memory`
- `alloc(size: i32) -> i32`: reserve `size` bytes for the arguments
- `describe() -> i32`: pointer to a NUL-terminated JSON object
  {"name": <tool_name>, "description": "...", "parameters": <JSON schema>}
- `execute(ptr: i32, len: i32) -> i32`: receives the JSON arguments at
  `ptr`/`len` and returns a pointer to a NUL-terminated UTF-8 result

Example:
```wat
(module
  (memory (export "memory") 1)
  (data (i32.const 0) "{\"name\":\"Echo\",\"description\":\"Echo arguments\",\"parameters\":{\"type\":\"object\"}}\00")
  (global $heap (mut i32) (i32.const 1024))
  (func $alloc (export "alloc") (param $size i32) (result i32)
    (local $old i32)
    (local.set $old (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (i32.add (local.get $size) (i32.const 1))))
    (local.get $old))
  (func (export "describe") (result i32) (i32.const 0))
  (func (export "execute") (param $ptr i32) (param $len i32) (result i32)
    (i32.store8 (i32.add (local.get $ptr) (local.get $len)) (i32.const 0))
    (local.get $ptr)))
```"#;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EmpowerParams {
    /// WebAssembly text source of a module implementing the tool ABI.
    pub code: String,
    /// Name of the tool to add (e.g., "MyNewTool"); must match the name returned by `describe`.
    pub tool_name: String,
}

pub struct Empower {
    tools: ToolManager,
    approval: Arc<dyn ApprovalGate>,
    loader: WasmToolLoader,
}

impl Empower {
    /// The approval gate is mandatory; there is no way to skip it.
    pub fn new(tools: ToolManager, approval: Arc<dyn ApprovalGate>, loader: WasmToolLoader) -> Self {
        Self {
            tools,
            approval,
            loader,
        }
    }

    pub fn for_session(ctx: &SessionContext, loader: WasmToolLoader) -> Self {
        Self::new(ctx.tools.clone(), Arc::clone(&ctx.approval), loader)
    }
}

#[async_trait]
impl Tool for Empower {
    fn name(&self) -> &str {
        "Empower"
    }
    fn description(&self) -> &str {
        DESCRIPTION
    }
    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<EmpowerParams>()
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: EmpowerParams = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;
        let name = params.tool_name.trim();

        if !self.approval.approve(name, &params.code).await {
            tracing::info!(tool = name, "operator declined tool definition");
            return Ok(ToolResult::error(format!(
                "Operator declined to add tool {name}"
            )));
        }

        let tool = match self.loader.load(&params.code, name).await {
            Ok(tool) => tool,
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "rejected tool definition");
                return Ok(ToolResult::error(err.to_string()));
            }
        };

        match self.tools.register_dynamic(name, Arc::new(tool)) {
            Ok(DynamicRegistration::Added) => {
                tracing::info!(tool = name, "added dynamic tool");
                Ok(ToolResult::success(serde_json::json!({
                    "success": true,
                    "message": format!("Tool {name} has been evaluated and added to the chat"),
                })))
            }
            Ok(DynamicRegistration::AlreadyActive) => {
                tracing::warn!(tool = name, "tool is already active");
                Ok(ToolResult::success(serde_json::json!({
                    "success": false,
                    "message": format!("Tool {name} is already active"),
                })))
            }
            Err(err) => Ok(ToolResult::error(err.to_string())),
        }
    }
}
