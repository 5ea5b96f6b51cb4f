//! ListFiles: recursive directory listing with a depth limit.

use crate::error::ToolError;
use crate::paths::resolve;
use crate::traits::{schema_for, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use ignore::WalkBuilder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

const DEFAULT_MAX_DEPTH: u64 = 10;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListFilesParams {
    /// Optional relative path to list files from. Defaults to current directory if not provided.
    #[serde(default)]
    pub path: Option<String>,
    /// Maximum depth to recurse into directories (non-negative integer). Default: 10.
    #[serde(default)]
    pub max_depth: Option<Value>,
}

pub struct ListFiles;

#[async_trait]
impl Tool for ListFiles {
    fn name(&self) -> &str {
        "ListFiles"
    }
    fn label(&self) -> &str {
        "List Files"
    }
    fn description(&self) -> &str {
        "Recursively list files and directories at a given path. \
         If no path is provided, lists files in the current directory."
    }
    fn parameters_schema(&self) -> Value {
        schema_for::<ListFilesParams>()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let params: ListFilesParams = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;

        let root = resolve(params.path.as_deref().unwrap_or_default(), &ctx.working_dir);
        if !root.is_dir() {
            return Ok(ToolResult::error("Path does not exist"));
        }
        let Some(max_depth) = normalize_max_depth(params.max_depth.as_ref()) else {
            return Ok(ToolResult::error(
                "Invalid max_depth: must be a non-negative integer",
            ));
        };

        let entries = tokio::task::spawn_blocking(move || list_entries(&root, max_depth))
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        Ok(ToolResult::success(entries))
    }
}

/// Accept a non-negative integer or a string holding one.
fn normalize_max_depth(value: Option<&Value>) -> Option<u64> {
    match value {
        None | Some(Value::Null) => Some(DEFAULT_MAX_DEPTH),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    }
}

/// Depth-first listing, siblings sorted by name. Hidden entries are skipped,
/// as are directories that cannot be read.
fn list_entries(root: &Path, max_depth: u64) -> Vec<String> {
    // Depth 0 is the root itself, so its children sit at depth 1.
    let walk_depth = usize::try_from(max_depth)
        .unwrap_or(usize::MAX)
        .saturating_add(1);
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .max_depth(Some(walk_depth))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut results = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            results.push(format!("{}/", path.display()));
        } else {
            results.push(path.display().to_string());
        }
    }
    results
}
