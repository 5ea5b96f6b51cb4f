//! TokenStats: lets the model inspect and reset usage counters.

use crate::usage::{SharedTracker, TokenTracker};
use async_trait::async_trait;
use quill_tools::{Tool, ToolContext, ToolError, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;

pub const TOKEN_STATS: &str = "TokenStats";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TokenStatsParams {
    /// Action to perform: 'session' (show session stats), 'global' (show
    /// global stats), 'reset_session' (reset session counters), or
    /// 'reset_global' (reset all global stats)
    pub action: String,
}

pub struct TokenStats {
    tracker: SharedTracker,
}

impl TokenStats {
    pub fn new(tracker: SharedTracker) -> Self {
        Self { tracker }
    }

    fn tracker(&self) -> MutexGuard<'_, TokenTracker> {
        self.tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Tool for TokenStats {
    fn name(&self) -> &str {
        TOKEN_STATS
    }
    fn label(&self) -> &str {
        "Token Stats"
    }
    fn description(&self) -> &str {
        "View or manage token usage statistics for this agent session and globally"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(TokenStatsParams))
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: TokenStatsParams = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;

        let result = match params.action.to_lowercase().as_str() {
            "session" => {
                let s = self.tracker().session();
                ToolResult::success(format!(
                    "Current session token usage: {} input + {} output = {} total tokens",
                    s.input_tokens,
                    s.output_tokens,
                    s.total_tokens()
                ))
            }
            "global" => ToolResult::success(self.tracker().global_line()),
            "reset_session" => {
                self.tracker().reset_session();
                ToolResult::success("Session token counters have been reset to zero.")
            }
            "reset_global" => match self.tracker().reset_global() {
                Ok(()) => ToolResult::success("Global token statistics have been reset to zero."),
                Err(err) => ToolResult::error(err.to_string()),
            },
            _ => ToolResult::error(
                "Invalid action. Use 'session', 'global', 'reset_session', or 'reset_global'",
            ),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::GlobalStatsStore;
    use quill_provider::Usage;
    use serde_json::json;

    fn tool(dir: &std::path::Path) -> (TokenStats, SharedTracker) {
        let tracker = TokenTracker::shared(GlobalStatsStore::at(dir.join("stats.json")));
        tracker.lock().unwrap().track(
            Usage {
                input_tokens: 40,
                output_tokens: 2,
            },
            "qwen3:14b",
            None,
        );
        (TokenStats::new(tracker.clone()), tracker)
    }

    #[tokio::test]
    async fn test_session_action_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, _) = tool(dir.path());
        let result = tool
            .execute(json!({"action": "Session"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(
            result.content,
            json!("Current session token usage: 40 input + 2 output = 42 total tokens")
        );
    }

    #[tokio::test]
    async fn test_global_action() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, _) = tool(dir.path());
        let result = tool
            .execute(json!({"action": "global"}), &ToolContext::default())
            .await
            .unwrap();
        let text = result.to_message_content();
        assert!(text.contains("40 input + 2 output = 42 total tokens across 1 sessions"));
    }

    #[tokio::test]
    async fn test_reset_actions() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, tracker) = tool(dir.path());

        let result = tool
            .execute(json!({"action": "reset_session"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(result.content, json!("Session token counters have been reset to zero."));
        assert_eq!(tracker.lock().unwrap().session().total_tokens(), 0);
        assert_eq!(tracker.lock().unwrap().global_stats().total_tokens, 42);

        tool.execute(json!({"action": "reset_global"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(tracker.lock().unwrap().global_stats().total_tokens, 0);
    }

    #[tokio::test]
    async fn test_invalid_action() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, _) = tool(dir.path());
        let result = tool
            .execute(json!({"action": "explode"}), &ToolContext::default())
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(
            result.content,
            json!({"error": "Invalid action. Use 'session', 'global', 'reset_session', or 'reset_global'"})
        );

        assert!(tool.execute(json!({}), &ToolContext::default()).await.is_err());
    }
}
