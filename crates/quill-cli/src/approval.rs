//! Operator confirmation for runtime-defined tools.

use async_trait::async_trait;
use quill_tools::ApprovalGate;
use std::io::Write;

const SEPARATOR: &str = "------------------------------------------------------------";

/// Asks on the terminal before Empower loads model-written code.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalApproval;

#[async_trait]
impl ApprovalGate for TerminalApproval {
    async fn approve(&self, tool_name: &str, source: &str) -> bool {
        println!("\n{SEPARATOR}");
        println!("The model wants to define a new tool: {tool_name}");
        println!("{SEPARATOR}");
        println!("{source}");
        println!("{SEPARATOR}");
        print!("Do you want to proceed with adding this tool? (y/n) ");
        let _ = std::io::stdout().flush();

        let answer = tokio::task::spawn_blocking(read_answer)
            .await
            .ok()
            .flatten();
        let approved = is_yes(answer.as_deref());
        tracing::info!(tool = tool_name, approved, "operator answered");
        approved
    }
}

fn read_answer() -> Option<String> {
    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

/// Only a plain `y` approves; EOF declines.
fn is_yes(answer: Option<&str>) -> bool {
    answer.is_some_and(|a| a.trim() == "y")
}

#[cfg(test)]
mod tests {
    use super::is_yes;

    #[test]
    fn test_only_y_approves() {
        assert!(is_yes(Some("y\n")));
        assert!(is_yes(Some("  y  ")));
        assert!(!is_yes(Some("yes\n")));
        assert!(!is_yes(Some("n\n")));
        assert!(!is_yes(Some("\n")));
        assert!(!is_yes(None));
    }
}
