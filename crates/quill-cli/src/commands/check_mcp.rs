//! `quill check-mcp`: MCP discovery diagnostics.

use quill_mcp::{
    load_server_config, server_config_from_env, McpClient, ServerConfig, DEFAULT_CONFIG_FILE,
};
use std::path::{Path, PathBuf};

/// Try the config file, then the environment, and report what connects.
pub async fn run(mcp_config: Option<&Path>) -> anyhow::Result<()> {
    let path = match mcp_config {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?.join(DEFAULT_CONFIG_FILE),
    };

    println!("Checking MCP configuration from {}...", path.display());
    match load_server_config(&path) {
        Ok(Some(config)) => {
            if check(config, "the config file").await {
                return Ok(());
            }
        }
        Ok(None) => println!("❌ No MCP server defined in {}", path.display()),
        Err(err) => println!("❌ {err}"),
    }

    println!("\nTrying environment variables as fallback...");
    if let Some(config) = server_config_from_env(|key| std::env::var(key).ok()) {
        if check(config, "environment variables").await {
            return Ok(());
        }
    } else {
        println!("❌ Neither MCP_SERVER_URL nor MCP_SERVER_COMMAND is set");
    }

    anyhow::bail!(
        "Please check your {} configuration or environment variables.",
        display_name(&path)
    )
}

async fn check(config: ServerConfig, source: &str) -> bool {
    let server = config.name.clone();
    match McpClient::connect(config).await {
        Ok((_client, tools)) => {
            println!("✅ MCP client connected successfully using {source} (server '{server}')");
            println!("Available MCP tools:");
            for tool in tools {
                println!("  - {}: {}", tool.name, tool.description);
            }
            true
        }
        Err(err) => {
            println!("❌ Failed to connect to MCP server '{server}' using {source}: {err}");
            false
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/work/project/mcp.json")), "mcp.json");
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp.json");
        std::fs::write(
            &path,
            r#"{
                // local test server
                "mcpServers": { "ghost": { "command": "/nonexistent/mcp-ghost" } }
            }"#,
        )
        .unwrap();

        let config = load_server_config(&path).unwrap().unwrap();
        assert!(!check(config, "the config file").await);
    }
}
