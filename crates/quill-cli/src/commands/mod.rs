//! Subcommand implementations and the session setup they share.

pub mod chat;
pub mod check_mcp;
pub mod exec;
pub mod tools;

use quill_core::{
    build_toolset, Agent, AgentConfig, Config, EventCallback, GlobalStatsStore, RequestUsage,
    SharedTracker, TokenTracker,
};
use quill_provider::{
    new_ollama_provider, new_openai_provider, new_openrouter_provider, Provider, Usage,
};
use quill_tools::{ApprovalGate, SessionContext, ToolManager};
use std::path::Path;
use std::sync::Arc;

/// Build the configured chat backend.
pub fn create_provider(config: &Config) -> anyhow::Result<Box<dyn Provider>> {
    let env = |key: &str| std::env::var(key).ok();
    let require_key = |provider: &str| {
        config.api_key(provider, env).ok_or_else(|| {
            anyhow::anyhow!(
                "{var} not set. Set it with:\n  export {var}=your-key-here",
                var = format!("{}_API_KEY", provider.to_uppercase())
            )
        })
    };

    let mut provider: Box<dyn Provider> = match config.provider.as_str() {
        "ollama" => Box::new(new_ollama_provider(config.ollama_base_url.clone())),
        "openai" => Box::new(new_openai_provider(require_key("openai")?)),
        "openrouter" => Box::new(new_openrouter_provider(require_key("openrouter")?)),
        other => anyhow::bail!("Unknown provider: {other}. Available: ollama, openai, openrouter"),
    };

    if let Some(model) = &config.model {
        provider
            .set_model(model)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
    }
    Ok(provider)
}

/// Assemble the tool manager: built-ins, then MCP, then TokenStats.
pub async fn create_toolset(
    config: &Config,
    mcp_config: Option<&Path>,
    tracker: SharedTracker,
) -> anyhow::Result<ToolManager> {
    let cwd = std::env::current_dir()?;
    let mcp = quill_mcp::discover_server(mcp_config, &cwd);
    Ok(build_toolset(config.profile, mcp, tracker).await?)
}

/// A ready-to-use agent plus its usage tracker.
pub struct Session {
    pub agent: Agent,
    pub tracker: SharedTracker,
}

impl Session {
    pub async fn start(
        config: &Config,
        mcp_config: Option<&Path>,
        approval: Arc<dyn ApprovalGate>,
        on_event: EventCallback,
    ) -> anyhow::Result<Self> {
        let provider = create_provider(config)?;
        let tracker = TokenTracker::shared(GlobalStatsStore::default());
        let tools = create_toolset(config, mcp_config, tracker.clone()).await?;
        let ctx = SessionContext::new(tools, approval, std::env::current_dir()?);

        let mut agent_config = AgentConfig::default();
        if let Some(prompt) = &config.system_prompt {
            agent_config.system_prompt = Some(prompt.clone());
        }
        if let Some(max) = config.max_iterations {
            agent_config.max_iterations = max;
        }

        tracing::info!(
            provider = provider.name(),
            model = provider.current_model(),
            profile = %config.profile,
            "session started"
        );
        let agent = Agent::new(provider, ctx, agent_config).on_event(on_event);
        Ok(Self { agent, tracker })
    }

    /// Fold a finished turn into the usage counters.
    pub fn record(&self, usage: Usage) -> RequestUsage {
        let provider = self.agent.provider();
        let pricing = provider.current_model_info().and_then(|m| m.pricing);
        let mut tracker = self
            .tracker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tracker.track(usage, provider.current_model(), pricing)
    }

    pub fn tracker(&self) -> std::sync::MutexGuard<'_, TokenTracker> {
        self.tracker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Prints streamed text and announces tool calls.
pub fn print_events() -> EventCallback {
    use quill_provider::StreamEvent;
    use std::io::Write;

    Box::new(|event: &StreamEvent| match event {
        StreamEvent::TextDelta { delta } => {
            print!("{delta}");
            let _ = std::io::stdout().flush();
        }
        StreamEvent::ToolCallStart { name, .. } => println!("\n🔧 {name}"),
        _ => {}
    })
}
