//! `quill tools`: inspect the registry without starting a chat.

use quill_core::{Config, GlobalStatsStore, TokenTracker};
use quill_tools::{DenyAll, SessionContext, Tool, BUILTIN_TOOLS};
use std::path::Path;
use std::sync::Arc;

pub async fn run(config: &Config, mcp_config: Option<&Path>, name: Option<&str>) -> anyhow::Result<()> {
    let tracker = TokenTracker::shared(GlobalStatsStore::default());
    let tools = super::create_toolset(config, mcp_config, tracker).await?;
    let ctx = SessionContext::new(tools.clone(), Arc::new(DenyAll), std::env::current_dir()?);

    match name {
        Some(name) => print_tool_detail(&ctx, name)?,
        None => print_tool_list(&ctx),
    }

    Ok(())
}

fn instantiate(ctx: &SessionContext, name: &str) -> anyhow::Result<Arc<dyn Tool>> {
    Ok(ctx.tools.entry(name)?.instantiate(ctx))
}

fn print_tool_list(ctx: &SessionContext) {
    let status = ctx.tools.status();
    println!("Registered tools ({}):", status.len());
    for (name, active) in status {
        let marker = if active { "✅" } else { "⭕" };
        let description = instantiate(ctx, &name)
            .map(|tool| first_line(tool.description()).to_string())
            .unwrap_or_else(|_| "unknown tool".to_string());
        println!("{marker} {name} [{}] - {description}", tool_kind(&name));
    }
}

fn print_tool_detail(ctx: &SessionContext, name: &str) -> anyhow::Result<()> {
    let tool = instantiate(ctx, name)?;
    let schema = serde_json::to_string_pretty(&tool.parameters_schema())?;

    println!("name: {}", tool.name());
    println!("kind: {}", tool_kind(tool.name()));
    println!("label: {}", tool.label());
    println!("active: {}", ctx.tools.is_active(name));
    println!("description: {}", tool.description());
    println!("parameters:");
    println!("{schema}");

    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

fn tool_kind(name: &str) -> &'static str {
    if BUILTIN_TOOLS.contains(&name) || name == "TokenStats" {
        "builtin"
    } else {
        "mcp"
    }
}
