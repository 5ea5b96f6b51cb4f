//! CLI argument and command definitions.

use clap::{Parser, Subcommand};
use quill_core::{Config, Profile};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "quill",
    version,
    about = "quill: a terminal coding agent whose toolset grows while it runs"
)]
pub struct Cli {
    /// Chat backend: ollama, openai or openrouter.
    #[arg(long, env = "PROVIDER", global = true)]
    pub provider: Option<String>,

    /// Model to use (defaults to the provider's default model).
    #[arg(long, env = "MODEL_ID", global = true)]
    pub model: Option<String>,

    /// Which tools start out active: coder or planner.
    #[arg(long, global = true)]
    pub profile: Option<Profile>,

    /// MCP server config file (defaults to ./mcp.json).
    #[arg(long, global = true)]
    pub mcp_config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Start an interactive chat session (default).
    Chat,

    /// Execute a single prompt and exit.
    Exec {
        /// The prompt to execute.
        prompt: String,
    },

    /// List registered tools, or show one tool in detail.
    Tools {
        /// Tool name.
        name: Option<String>,
    },

    /// Check that the configured MCP server is reachable and list its tools.
    CheckMcp,
}

impl Cli {
    /// Merge flags over the config file and environment.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(provider) = self.provider.as_ref().filter(|p| !p.is_empty()) {
            config.provider = provider.clone();
        }
        if let Some(model) = self.model.as_ref().filter(|m| !m.is_empty()) {
            config.model = Some(model.clone());
        }
        if let Some(profile) = self.profile {
            config.profile = profile;
        }
    }
}
