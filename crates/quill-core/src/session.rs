//! Toolset assembly for a new session.

use crate::config::Profile;
use crate::error::QuillError;
use crate::token_stats::TokenStats;
use crate::usage::SharedTracker;
use quill_mcp::ServerConfig;
use quill_tools::{load_mcp_tools, register_builtins, ToolManager};
use std::sync::Arc;

/// Build the session's tool manager.
///
/// Registration order is built-ins, then MCP tools, then TokenStats. The
/// profile's tools are enabled first; MCP tools are enabled as they are
/// registered. An unreachable MCP server is logged and skipped.
pub async fn build_toolset(
    profile: Profile,
    mcp: Option<ServerConfig>,
    tracker: SharedTracker,
) -> Result<ToolManager, QuillError> {
    let manager = ToolManager::new();
    register_builtins(&manager)?;

    let initial = profile.initial_tools();
    for name in initial.iter().filter(|n| manager.is_registered(n)) {
        manager.enable(name);
    }

    if let Some(config) = mcp {
        let server = config.name.clone();
        match load_mcp_tools(&manager, config).await {
            Ok(names) => tracing::info!(%server, tools = ?names, "MCP tools added"),
            Err(err) => tracing::warn!(%server, error = %err, "continuing without MCP tools"),
        }
    }

    manager.register_tool(Arc::new(TokenStats::new(tracker)))?;
    if initial.contains(&crate::token_stats::TOKEN_STATS) {
        manager.enable(crate::token_stats::TOKEN_STATS);
    }

    tracing::debug!(%profile, active = ?manager.active_names(), "toolset ready");
    Ok(manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{GlobalStatsStore, TokenTracker};
    use quill_mcp::TransportConfig;
    use quill_tools::{BUILTIN_TOOLS, PLANNER_TOOLS};
    use std::time::Duration;

    fn tracker(dir: &std::path::Path) -> SharedTracker {
        TokenTracker::shared(GlobalStatsStore::at(dir.join("stats.json")))
    }

    #[tokio::test]
    async fn test_coder_profile_enables_everything() {
        let dir = tempfile::tempdir().unwrap();
        let manager = build_toolset(Profile::Coder, None, tracker(dir.path()))
            .await
            .unwrap();

        let mut expected: Vec<String> = BUILTIN_TOOLS.iter().map(|s| s.to_string()).collect();
        expected.push("TokenStats".to_string());
        assert_eq!(manager.active_names(), expected);
        assert!(manager.inactive_names().is_empty());
    }

    #[tokio::test]
    async fn test_planner_profile_leaves_rest_inactive() {
        let dir = tempfile::tempdir().unwrap();
        let manager = build_toolset(Profile::Planner, None, tracker(dir.path()))
            .await
            .unwrap();

        assert_eq!(manager.active_names(), PLANNER_TOOLS);
        let status = manager.status();
        assert_eq!(status.last(), Some(&("TokenStats".to_string(), false)));
        assert!(status.contains(&("RunShellCommand".to_string(), false)));
    }

    #[tokio::test]
    async fn test_unreachable_mcp_server_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            name: "broken".to_string(),
            transport: TransportConfig::Stdio {
                command: "/nonexistent/quill-mcp-server".to_string(),
                args: vec![],
                env: Default::default(),
                cwd: None,
            },
            startup_timeout: Duration::from_secs(2),
            tool_timeout: Duration::from_secs(2),
        };

        let manager = build_toolset(Profile::Planner, Some(config), tracker(dir.path()))
            .await
            .unwrap();
        assert_eq!(manager.active_names(), PLANNER_TOOLS);
    }
}
