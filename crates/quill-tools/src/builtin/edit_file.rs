//! EditFile: replace the first occurrence of a string, creating the file if needed.

use crate::error::ToolError;
use crate::paths::resolve;
use crate::traits::{schema_for, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EditFileParams {
    /// The path to the file.
    pub path: String,
    /// Text to search for - must match exactly and must only have one match exactly.
    pub old_str: String,
    /// Text to replace old_str with.
    pub new_str: String,
}

pub struct EditFile;

#[async_trait]
impl Tool for EditFile {
    fn name(&self) -> &str {
        "EditFile"
    }
    fn label(&self) -> &str {
        "Edit File"
    }
    fn description(&self) -> &str {
        "Make edits to a text file.\n\n\
         Replaces 'old_str' with 'new_str' in the given file.\n\
         'old_str' and 'new_str' MUST be different from each other.\n\n\
         If the file specified with path doesn't exist, it will be created."
    }
    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<EditFileParams>()
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: EditFileParams = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;

        let path = resolve(&params.path, &ctx.working_dir);
        tracing::info!(path = %path.display(), "editing file");

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };

        let updated = content.replacen(&params.old_str, &params.new_str, 1);
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(ToolResult::error(e.to_string()));
            }
        }
        if let Err(e) = tokio::fs::write(&path, updated).await {
            return Ok(ToolResult::error(e.to_string()));
        }

        Ok(ToolResult::success(serde_json::json!({
            "success": true,
            "path": params.path,
        })))
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
    async fn test_replaces_first_occurrence_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f.txt"), "foo bar foo").unwrap();

        let result = EditFile
            .execute(
                serde_json::json!({"path": "f.txt", "old_str": "foo", "new_str": "baz"}),
                &test_ctx(&dir),
            )
            .await
            .unwrap();

        assert_eq!(result.content["success"], true);
        assert_eq!(
            fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "baz bar foo"
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_created() {
        let dir = TempDir::new().unwrap();
        EditFile
            .execute(
                serde_json::json!({"path": "new/hello.txt", "old_str": "", "new_str": "hello"}),
                &test_ctx(&dir),
            )
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("new/hello.txt")).unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_no_match_leaves_content() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f.txt"), "unchanged").unwrap();
        EditFile
            .execute(
                serde_json::json!({"path": "f.txt", "old_str": "absent", "new_str": "x"}),
                &test_ctx(&dir),
            )
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("f.txt")).unwrap(), "unchanged");
    }

    #[tokio::test]
    async fn test_directory_path_is_error() {
        let dir = TempDir::new().unwrap();
        let result = EditFile
            .execute(
                serde_json::json!({"path": ".", "old_str": "a", "new_str": "b"}),
                &test_ctx(&dir),
            )
            .await
            .unwrap();
        assert!(result.is_error);
    }
}
