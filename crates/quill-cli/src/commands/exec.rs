//! Single-shot exec command.

use super::{print_events, Session};
use crate::approval::TerminalApproval;
use quill_core::{Config, Message, TokenTracker};
use std::path::Path;
use std::sync::Arc;

/// Execute a single prompt, stream the reply and print its usage.
pub async fn run(config: &Config, mcp_config: Option<&Path>, prompt: &str) -> anyhow::Result<()> {
    let session = Session::start(config, mcp_config, Arc::new(TerminalApproval), print_events()).await?;

    let mut messages: Vec<Message> = Vec::new();
    let outcome = session.agent.process(&mut messages, prompt).await?;
    println!();

    let request = session.record(outcome.usage);
    eprintln!("{}", TokenTracker::request_summary(&request));
    Ok(())
}
