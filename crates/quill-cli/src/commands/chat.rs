//! Interactive REPL.

use super::{print_events, Session};
use crate::approval::TerminalApproval;
use quill_core::{Config, Message, TokenTracker};
use quill_tools::ToolManager;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

const HELP: &str = "\
Commands:
  exit              print the session summary and quit
  /tokens           session token usage and cost
  /global_tokens    usage across all sessions
  /reset_tokens     reset the session counters
  /tools            list tools (✅ active, ⭕ inactive)
  /enable NAME      activate a registered tool
  /disable NAME     deactivate a tool
  /reset_tools      deactivate every tool
  /help             this help";

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Exit,
    Tokens,
    GlobalTokens,
    ResetTokens,
    Tools,
    Enable(&'a str),
    Disable(&'a str),
    ResetTools,
    Help,
    Empty,
    Unknown(&'a str),
    Prompt(&'a str),
}

fn parse_command(input: &str) -> ReplCommand<'_> {
    let input = input.trim();
    if input.is_empty() {
        return ReplCommand::Empty;
    }
    if input == "exit" {
        return ReplCommand::Exit;
    }
    if !input.starts_with('/') {
        return ReplCommand::Prompt(input);
    }

    let (command, arg) = match input.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (input, ""),
    };
    match (command, arg) {
        ("/tokens", _) => ReplCommand::Tokens,
        ("/global_tokens", _) => ReplCommand::GlobalTokens,
        ("/reset_tokens", _) => ReplCommand::ResetTokens,
        ("/tools", _) => ReplCommand::Tools,
        ("/enable", name) if !name.is_empty() => ReplCommand::Enable(name),
        ("/disable", name) if !name.is_empty() => ReplCommand::Disable(name),
        ("/reset_tools", _) => ReplCommand::ResetTools,
        ("/help", _) => ReplCommand::Help,
        _ => ReplCommand::Unknown(input),
    }
}

/// Status listing used by `/tools`.
pub fn tool_status_lines(tools: &ToolManager) -> Vec<String> {
    tools
        .status()
        .into_iter()
        .map(|(name, active)| format!("  {} {name}", if active { "✅" } else { "⭕" }))
        .collect()
}

async fn read_line() -> anyhow::Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map(|n| (n > 0).then_some(line))
    })
    .await??;
    Ok(line)
}

/// Run interactive chat mode.
pub async fn run(config: &Config, mcp_config: Option<&Path>) -> anyhow::Result<()> {
    let session = Session::start(config, mcp_config, Arc::new(TerminalApproval), print_events()).await?;
    let tools = session.agent.tools().clone();

    println!("Chat with the agent. Type 'exit' to ... well, exit");
    println!("Special commands: '/tokens' (session stats), '/global_tokens' (global stats), '/reset_tokens' (reset session), '/tools', '/help'");

    let mut messages: Vec<Message> = Vec::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = read_line().await? else {
            println!("\n{}", session.tracker().session_summary());
            break;
        };

        match parse_command(&line) {
            ReplCommand::Exit => {
                println!("\n{}", session.tracker().session_summary());
                break;
            }
            ReplCommand::Tokens => println!("\n{}", session.tracker().session_summary()),
            ReplCommand::GlobalTokens => println!("\n{}", session.tracker().global_summary()),
            ReplCommand::ResetTokens => {
                session.tracker().reset_session();
                println!("Session token counters reset.");
            }
            ReplCommand::Tools => {
                println!("\nAvailable Tools:");
                for line in tool_status_lines(&tools) {
                    println!("{line}");
                }
            }
            ReplCommand::Enable(name) => {
                if tools.enable(name) {
                    println!("Enabled {name}.");
                } else if tools.is_active(name) {
                    println!("⚠️  Tool {name} is already active");
                } else {
                    println!("Unknown tool: {name}");
                }
            }
            ReplCommand::Disable(name) => {
                if tools.disable(name) {
                    println!("Disabled {name}.");
                } else {
                    println!("{name} is not active.");
                }
            }
            ReplCommand::ResetTools => {
                tools.disable_all();
                println!("All tools disabled.");
            }
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Empty => {}
            ReplCommand::Unknown(input) => println!("Unknown command: {input}. Type /help."),
            ReplCommand::Prompt(prompt) => match session.agent.process(&mut messages, prompt).await {
                Ok(outcome) => {
                    println!();
                    let request = session.record(outcome.usage);
                    println!("\n{}", TokenTracker::request_summary(&request));
                }
                Err(err) => {
                    println!();
                    eprintln!("Error: {err}");
                }
            },
        }
    }

    Ok(())
}
