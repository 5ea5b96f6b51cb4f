//! Agent loop implementation.
//!
//! The agent loop is the core processing cycle:
//! 1. Resolve the active tools and send messages to the provider
//! 2. Parse the streaming response
//! 3. Execute any tool calls, one after another
//! 4. Repeat until the model stops calling tools or max iterations is reached
//!
//! Tools are resolved again before every request, so a tool enabled or
//! defined during one step is offered on the next.

use crate::message::{ContentBlock, Message, Role};
use futures::StreamExt;
use quill_provider::{
    Provider, ProviderContent, ProviderError, ProviderMessage, Request, StreamEvent,
    ToolDefinition, Usage,
};
use quill_tools::{dispatch, SessionContext, Tool, ToolManager};
use std::sync::Arc;

const MAX_ITERATIONS: usize = 50;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Perform the tasks requested as quickly as possible.\nWhen you call a tool, tell me what tool you called.";

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum number of tool-use iterations before stopping.
    pub max_iterations: usize,
    /// System prompt.
    pub system_prompt: Option<String>,
    /// Maximum tokens per response.
    pub max_tokens: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            max_tokens: None,
        }
    }
}

/// Callback for streaming events.
pub type EventCallback = Box<dyn Fn(&StreamEvent) + Send + Sync>;

/// Result of one user turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The final assistant message.
    pub message: Message,
    /// Tokens used across every request of the turn.
    pub usage: Usage,
}

/// The main agent that orchestrates LLM calls and tool execution.
pub struct Agent {
    provider: Box<dyn Provider>,
    session: SessionContext,
    config: AgentConfig,
    on_event: Option<EventCallback>,
}

impl Agent {
    /// Create a new agent.
    pub fn new(provider: Box<dyn Provider>, session: SessionContext, config: AgentConfig) -> Self {
        Self {
            provider,
            session,
            config,
            on_event: None,
        }
    }

    /// Set the event callback for streaming updates.
    pub fn on_event(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub fn tools(&self) -> &ToolManager {
        &self.session.tools
    }

    /// Process user input and return the assistant's response.
    ///
    /// This runs the full agent loop: send to provider → parse response →
    /// execute tools → send tool results → repeat until done.
    pub async fn process(
        &self,
        messages: &mut Vec<Message>,
        user_input: &str,
    ) -> Result<TurnOutcome, AgentProcessError> {
        messages.push(Message::user(user_input));

        let tool_ctx = self.session.tool_context();
        let mut usage = Usage::default();
        let mut offered_revision: Option<u64> = None;

        for iteration in 0..self.config.max_iterations {
            let revision = self.session.tools.revision();
            let tools = self.session.tools.resolve(&self.session);
            if offered_revision.is_some_and(|r| r != revision) {
                tracing::info!(
                    active = ?self.session.tools.active_names(),
                    "toolset changed since the previous request"
                );
            }
            offered_revision = Some(revision);

            let request = Request {
                messages: convert_messages(messages),
                tools: build_tool_definitions(&tools),
                system: self.config.system_prompt.clone(),
                max_tokens: self.config.max_tokens,
            };
            tracing::debug!(iteration, tools = request.tools.len(), "requesting completion");

            let mut stream = self.provider.stream(request).await?;

            let mut text_content = String::new();
            let mut tool_calls: Vec<PendingToolCall> = Vec::new();

            // Read to the end: usage may arrive after Done.
            while let Some(event) = stream.next().await {
                let event = event?;

                if let Some(ref cb) = self.on_event {
                    cb(&event);
                }

                match event {
                    StreamEvent::TextDelta { delta } => text_content.push_str(&delta),
                    StreamEvent::ToolCallStart { id, name } => tool_calls.push(PendingToolCall {
                        id,
                        name,
                        arguments: String::new(),
                    }),
                    StreamEvent::ToolCallDelta { id, delta } => {
                        let target = match tool_calls.iter().position(|tc| tc.id == id) {
                            Some(pos) => tool_calls.get_mut(pos),
                            None => tool_calls.last_mut(),
                        };
                        if let Some(tc) = target {
                            tc.arguments.push_str(&delta);
                        }
                    }
                    StreamEvent::Usage { input, output } => {
                        usage.input_tokens += input;
                        usage.output_tokens += output;
                    }
                    StreamEvent::ToolCallEnd { .. } | StreamEvent::Done { .. } => {}
                }
            }

            let parsed: Vec<(PendingToolCall, Result<serde_json::Value, String>)> = tool_calls
                .into_iter()
                .map(|tc| {
                    let args = tc.parse_arguments();
                    (tc, args)
                })
                .collect();

            let mut content_blocks = Vec::new();
            if !text_content.is_empty() {
                content_blocks.push(ContentBlock::Text { text: text_content });
            }
            for (tc, args) in &parsed {
                content_blocks.push(ContentBlock::ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: args.clone().unwrap_or_else(|_| serde_json::json!({})),
                });
            }

            let assistant_msg = Message::assistant(content_blocks);
            messages.push(assistant_msg.clone());

            let requested: Vec<String> = assistant_msg
                .tool_calls()
                .into_iter()
                .map(|(_, name, _)| name.to_string())
                .collect();
            if requested.is_empty() {
                return Ok(TurnOutcome {
                    message: assistant_msg,
                    usage,
                });
            }
            tracing::debug!(iteration, tools = ?requested, "model requested tool calls");

            for (tc, args) in parsed {
                tracing::info!(tool = %tc.name, "calling tool");
                let result = match args {
                    Ok(args) => dispatch(&tools, &tc.name, args, &tool_ctx).await,
                    Err(err) => quill_tools::ToolResult::error(err),
                };
                messages.push(Message::tool_result(
                    tc.id,
                    result.to_message_content(),
                    result.is_error,
                ));
            }
        }

        Err(AgentProcessError::MaxIterations(self.config.max_iterations))
    }
}

/// Convert internal messages to provider format.
fn convert_messages(messages: &[Message]) -> Vec<ProviderMessage> {
    messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|msg| {
            let content = msg
                .content
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => ProviderContent::Text { text: text.clone() },
                    ContentBlock::ToolCall {
                        id,
                        name,
                        arguments,
                    } => ProviderContent::ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        arguments: arguments.clone(),
                    },
                    ContentBlock::ToolResult {
                        tool_call_id,
                        content,
                        is_error,
                    } => ProviderContent::ToolResult {
                        tool_call_id: tool_call_id.clone(),
                        content: content.clone(),
                        is_error: *is_error,
                    },
                })
                .collect();

            ProviderMessage {
                role: msg.role.to_string(),
                content,
            }
        })
        .collect()
}

/// Build tool definitions for the provider.
fn build_tool_definitions(tools: &[Arc<dyn Tool>]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .map(|tool| ToolDefinition {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
        })
        .collect()
}

/// Pending tool call being accumulated from streaming events.
#[derive(Debug, Clone)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl PendingToolCall {
    /// Empty arguments mean "no arguments".
    fn parse_arguments(&self) -> Result<serde_json::Value, String> {
        if self.arguments.trim().is_empty() {
            return Ok(serde_json::json!({}));
        }
        serde_json::from_str(&self.arguments)
            .map_err(|e| format!("Invalid arguments for {}: {e}", self.name))
    }
}

/// Errors that can occur during agent processing.
#[derive(Debug, thiserror::Error)]
pub enum AgentProcessError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Max iterations ({0}) reached")]
    MaxIterations(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, BoxStream};
    use quill_provider::{ModelInfo, StopReason};
    use quill_tools::{register_builtins, DenyAll};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned event lists and records the tool names of each request.
    struct ScriptedProvider {
        steps: Mutex<VecDeque<Vec<StreamEvent>>>,
        offered: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl ScriptedProvider {
        fn new(steps: Vec<Vec<StreamEvent>>) -> (Self, Arc<Mutex<Vec<Vec<String>>>>) {
            let offered = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    steps: Mutex::new(steps.into()),
                    offered: offered.clone(),
                },
                offered,
            )
        }
    }

    #[async_trait::async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }
        fn models(&self) -> Vec<ModelInfo> {
            vec![]
        }
        fn current_model(&self) -> &str {
            "scripted"
        }
        fn set_model(&mut self, _: &str) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn stream(
            &self,
            request: Request,
        ) -> Result<BoxStream<'_, Result<StreamEvent, ProviderError>>, ProviderError> {
            self.offered
                .lock()
                .unwrap()
                .push(request.tools.iter().map(|t| t.name.clone()).collect());
            let events = self.steps.lock().unwrap().pop_front().unwrap_or_else(|| {
                vec![
                    StreamEvent::TextDelta {
                        delta: "again".to_string(),
                    },
                    done(StopReason::EndTurn),
                ]
            });
            Ok(stream::iter(events.into_iter().map(Ok)).boxed())
        }
    }

    fn done(reason: StopReason) -> StreamEvent {
        StreamEvent::Done { reason }
    }

    fn call(id: &str, name: &str, args: &str) -> Vec<StreamEvent> {
        vec![
            StreamEvent::ToolCallStart {
                id: id.to_string(),
                name: name.to_string(),
            },
            StreamEvent::ToolCallDelta {
                id: id.to_string(),
                delta: args.to_string(),
            },
            StreamEvent::ToolCallEnd { id: id.to_string() },
        ]
    }

    fn text(reply: &str) -> Vec<StreamEvent> {
        vec![
            StreamEvent::TextDelta {
                delta: reply.to_string(),
            },
            done(StopReason::EndTurn),
            StreamEvent::Usage {
                input: 30,
                output: 4,
            },
        ]
    }

    fn session(active: &[&str]) -> SessionContext {
        let manager = ToolManager::new();
        register_builtins(&manager).unwrap();
        for name in active {
            assert!(manager.enable(name));
        }
        let dir = std::env::temp_dir();
        SessionContext::new(manager, Arc::new(DenyAll), dir)
    }

    fn tool_results(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|b| match b {
                ContentBlock::ToolResult { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_agent_config_default() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, MAX_ITERATIONS);
        assert_eq!(config.system_prompt.as_deref(), Some(DEFAULT_SYSTEM_PROMPT));
    }

    #[test]
    fn test_convert_messages() {
        let messages = vec![
            Message::system("ignored"),
            Message::user("Hello"),
            Message::assistant(vec![ContentBlock::ToolCall {
                id: "c1".to_string(),
                name: "ListFiles".to_string(),
                arguments: serde_json::json!({}),
            }]),
            Message::tool_result("c1", "[]", false),
        ];

        let converted = convert_messages(&messages);
        let roles: Vec<&str> = converted.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "tool"]);
    }

    #[tokio::test]
    async fn test_plain_reply_collects_usage() {
        let (provider, _) = ScriptedProvider::new(vec![text("hello")]);
        let agent = Agent::new(Box::new(provider), session(&[]), AgentConfig::default());

        let mut messages = Vec::new();
        let outcome = agent.process(&mut messages, "hi").await.unwrap();
        assert_eq!(outcome.message.text(), "hello");
        assert_eq!(outcome.usage.total(), 34);
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn test_enabler_call_offers_new_tool_next_request() {
        let mut first = call("c1", "Enabler", "{\"tool\":\"ReadFile\"}");
        first.push(done(StopReason::ToolUse));
        first.push(StreamEvent::Usage {
            input: 100,
            output: 10,
        });
        let (provider, offered) = ScriptedProvider::new(vec![first, text("enabled")]);
        let ctx = session(&["Enabler"]);
        let agent = Agent::new(Box::new(provider), ctx.clone(), AgentConfig::default());

        let mut messages = Vec::new();
        let outcome = agent.process(&mut messages, "turn on ReadFile").await.unwrap();

        assert_eq!(outcome.message.text(), "enabled");
        assert_eq!(outcome.usage.input_tokens, 130);
        assert_eq!(tool_results(&messages), vec!["{\"success\":true}"]);
        assert!(ctx.tools.is_active("ReadFile"));

        let offered = offered.lock().unwrap();
        assert_eq!(offered[0], vec!["Enabler"]);
        assert_eq!(offered[1], vec!["Enabler", "ReadFile"]);
    }

    #[tokio::test]
    async fn test_inactive_tool_call_returns_error() {
        let mut first = call("c1", "RunShellCommand", "{\"command\":\"rm -rf /\"}");
        first.push(done(StopReason::ToolUse));
        let (provider, _) = ScriptedProvider::new(vec![first, text("ok")]);
        let agent = Agent::new(Box::new(provider), session(&["ListFiles"]), AgentConfig::default());

        let mut messages = Vec::new();
        agent.process(&mut messages, "clean up").await.unwrap();
        assert_eq!(
            tool_results(&messages),
            vec!["{\"error\":\"Tool 'RunShellCommand' is not active\"}"]
        );
    }

    #[tokio::test]
    async fn test_calls_run_in_order_and_bad_arguments_are_reported() {
        let mut first = call("c1", "Enabler", "{\"tool\":\"ReadFile\"}");
        first.extend(call("c2", "Enabler", "{\"tool\":"));
        first.extend(call("c3", "Enabler", "{\"tool\":\"ReadFile\"}"));
        first.push(done(StopReason::ToolUse));
        let (provider, _) = ScriptedProvider::new(vec![first, text("done")]);
        let agent = Agent::new(Box::new(provider), session(&["Enabler"]), AgentConfig::default());

        let mut messages = Vec::new();
        agent.process(&mut messages, "go").await.unwrap();

        let results = tool_results(&messages);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], "{\"success\":true}");
        assert!(results[1].contains("Invalid arguments for Enabler"));
        assert_eq!(results[2], "{\"error\":\"Tool ReadFile is already active\"}");
    }

    #[tokio::test]
    async fn test_delta_without_known_id_extends_last_call() {
        let first = vec![
            StreamEvent::ToolCallStart {
                id: "c1".to_string(),
                name: "Enabler".to_string(),
            },
            StreamEvent::ToolCallDelta {
                id: String::new(),
                delta: "{\"tool\":\"ListFiles\"}".to_string(),
            },
            done(StopReason::ToolUse),
        ];
        let (provider, _) = ScriptedProvider::new(vec![first, text("ok")]);
        let ctx = session(&["Enabler"]);
        let agent = Agent::new(Box::new(provider), ctx.clone(), AgentConfig::default());

        agent.process(&mut Vec::new(), "list").await.unwrap();
        assert!(ctx.tools.is_active("ListFiles"));
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let mut step = call("c1", "Enabler", "{\"tool\":\"Enabler\"}");
        step.push(done(StopReason::ToolUse));
        let (provider, _) = ScriptedProvider::new(vec![step.clone(), step.clone(), step]);
        let config = AgentConfig {
            max_iterations: 2,
            ..AgentConfig::default()
        };
        let agent = Agent::new(Box::new(provider), session(&["Enabler"]), config);

        let err = agent.process(&mut Vec::new(), "loop").await.unwrap_err();
        assert!(matches!(err, AgentProcessError::MaxIterations(2)));
    }
}
