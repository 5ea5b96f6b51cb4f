//! RunShellCommand: run a command through `/bin/sh -c` in the working directory.

use crate::error::ToolError;
use crate::traits::{schema_for, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RunShellCommandParams {
    /// The command to execute.
    pub command: String,
}

pub struct RunShellCommand;

#[async_trait]
impl Tool for RunShellCommand {
    fn name(&self) -> &str {
        "RunShellCommand"
    }
    fn label(&self) -> &str {
        "Run Shell Command"
    }
    fn description(&self) -> &str {
        "Execute a linux shell command"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<RunShellCommandParams>()
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: RunShellCommandParams = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;

        tracing::info!(command = %params.command, "running shell command");

        // No timeout: the command runs until it exits.
        let output = match Command::new("/bin/sh")
            .arg("-c")
            .arg(&params.command)
            .current_dir(&ctx.working_dir)
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stdout.is_empty() { stderr } else { stdout };
        let text = text.trim().to_string();

        if output.status.success() {
            tracing::info!(output = %text, "command executed successfully");
            Ok(ToolResult::success(serde_json::json!({
                "output": text,
                "success": true,
            })))
        } else {
            let code = output.status.code();
            tracing::info!(?code, output = %text, "command failed");
            Ok(ToolResult::success(serde_json::json!({
                "output": text,
                "success": false,
                "code": code,
            })))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_ctx(dir: &TempDir) -> ToolContext {
        ToolContext {
            working_dir: dir.path().to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_echo() {
        let dir = TempDir::new().unwrap();
        let result = RunShellCommand
            .execute(serde_json::json!({"command": "echo hello"}), &test_ctx(&dir))
            .await
            .unwrap();

        assert_eq!(
            result.content,
            serde_json::json!({"output": "hello", "success": true})
        );
    }

    #[tokio::test]
    async fn test_exit_code_and_stderr_fallback() {
        let dir = TempDir::new().unwrap();
        let result = RunShellCommand
            .execute(
                serde_json::json!({"command": "echo oops >&2; exit 42"}),
                &test_ctx(&dir),
            )
            .await
            .unwrap();

        assert_eq!(
            result.content,
            serde_json::json!({"output": "oops", "success": false, "code": 42})
        );
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let result = RunShellCommand
            .execute(serde_json::json!({"command": "ls"}), &test_ctx(&dir))
            .await
            .unwrap();
        assert_eq!(result.content["output"], "marker.txt");
    }
}
