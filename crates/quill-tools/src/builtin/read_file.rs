//! ReadFile: return a file's contents as a string.

use crate::error::ToolError;
use crate::paths::resolve;
use crate::traits::{schema_for, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileParams {
    /// The relative path of a file in the working directory.
    pub path: String,
}

pub struct ReadFile;

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "ReadFile"
    }
    fn label(&self) -> &str {
        "Read File"
    }
    fn description(&self) -> &str {
        "Read the contents of a given relative file path. Use this when you want to see \
         what's inside a file. Do not use this with directory names."
    }
    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<ReadFileParams>()
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: ReadFileParams = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;

        let path = resolve(&params.path, &ctx.working_dir);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(ToolResult::success(content)),
            Err(e) => Ok(ToolResult::error(format!("{}: {e}", params.path))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_ctx(dir: &TempDir) -> ToolContext {
        ToolContext {
            working_dir: dir.path().to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_read_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("test.txt"), "line1\nline2\n").unwrap();

        let result = ReadFile
            .execute(serde_json::json!({"path": "test.txt"}), &test_ctx(&dir))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.content, "line1\nline2\n");
        assert_eq!(result.to_message_content(), "line1\nline2\n");
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let dir = TempDir::new().unwrap();
        let result = ReadFile
            .execute(serde_json::json!({"path": "nope.txt"}), &test_ctx(&dir))
            .await
            .unwrap();

        assert!(result.is_error);
        assert!(result.content["error"].as_str().unwrap().starts_with("nope.txt"));
    }

    #[tokio::test]
    async fn test_missing_path_parameter() {
        let dir = TempDir::new().unwrap();
        let err = ReadFile
            .execute(serde_json::json!({}), &test_ctx(&dir))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }
}
