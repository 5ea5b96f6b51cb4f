//! Generic OpenAI-compatible provider.
//!
//! Handles the OpenAI chat completions API format used by Ollama, OpenAI,
//! OpenRouter, and many other backends.

use crate::error::ProviderError;
use crate::traits::Provider;
use crate::types::{ModelInfo, ProviderContent, Request, StopReason, StreamEvent};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;

/// Configuration for an OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    pub base_url: String,
    /// Sent as a bearer token when non-empty.
    pub api_key: String,
    pub provider_name: String,
    pub default_model: String,
    pub models: Vec<ModelInfo>,
    /// Allow model ids that are not listed in `models`.
    pub accept_any_model: bool,
}

/// A provider that speaks the OpenAI chat completions protocol.
pub struct OpenAiCompatProvider {
    config: OpenAiCompatConfig,
    model: String,
    client: Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let model = config.default_model.clone();
        Self {
            config,
            model,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Build the JSON request body.
    fn build_request_body(&self, request: Request) -> Value {
        let messages = convert_messages(&request);

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
            "stream_options": { "include_usage": true },
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = json!(request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect::<Vec<_>>());
        }

        body
    }
}

/// Convert messages to OpenAI format.
fn convert_messages(request: &Request) -> Vec<Value> {
    let mut messages = Vec::new();

    if let Some(ref system) = request.system {
        messages.push(json!({"role": "system", "content": system}));
    }

    for msg in &request.messages {
        // Tool results are sent one message per call, with role=tool.
        let tool_results: Vec<Value> = msg
            .content
            .iter()
            .filter_map(|c| match c {
                ProviderContent::ToolResult {
                    tool_call_id,
                    content,
                    ..
                } => Some(json!({
                    "role": "tool",
                    "tool_call_id": tool_call_id,
                    "content": content,
                })),
                _ => None,
            })
            .collect();
        if !tool_results.is_empty() {
            messages.extend(tool_results);
            continue;
        }

        let text: String = msg
            .content
            .iter()
            .filter_map(|c| match c {
                ProviderContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        let tool_calls: Vec<Value> = msg
            .content
            .iter()
            .filter_map(|c| match c {
                ProviderContent::ToolCall {
                    id,
                    name,
                    arguments,
                } => Some(json!({
                    "id": id,
                    "type": "function",
                    "function": {
                        "name": name,
                        "arguments": arguments.to_string(),
                    }
                })),
                _ => None,
            })
            .collect();

        if !tool_calls.is_empty() && msg.role == "assistant" {
            let mut msg_json = json!({
                "role": "assistant",
                "tool_calls": tool_calls,
            });
            if !text.is_empty() {
                msg_json["content"] = json!(text);
            }
            messages.push(msg_json);
            continue;
        }

        messages.push(json!({"role": msg.role, "content": text}));
    }

    messages
}

/// Incremental decoder for a chat-completions SSE body.
///
/// Bytes are buffered until a full line is available, so events split
/// across network chunks (including multi-byte UTF-8) decode correctly.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    /// Tool calls seen so far, by stream index, with their ids.
    calls: Vec<(u64, String)>,
    open_call: Option<String>,
    done: bool,
}

impl SseDecoder {
    /// Feed a network chunk and return the events of every completed line.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.handle_line(line.trim(), &mut events);
        }
        events
    }

    /// Flush whatever is left once the body ends.
    pub(crate) fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            self.handle_line(line.trim(), &mut events);
        }
        self.close_call(&mut events);
        if !self.done {
            self.done = true;
            events.push(StreamEvent::Done {
                reason: StopReason::EndTurn,
            });
        }
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data == "[DONE]" {
            self.close_call(events);
            if !self.done {
                self.done = true;
                events.push(StreamEvent::Done {
                    reason: StopReason::EndTurn,
                });
            }
            return;
        }

        let chunk: OpenAiChunk = match serde_json::from_str(data) {
            Ok(c) => c,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unparseable stream chunk");
                return;
            }
        };

        for choice in chunk.choices {
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                events.push(StreamEvent::TextDelta { delta: content });
            }

            for tc in choice.delta.tool_calls.unwrap_or_default() {
                let id = self.call_id(&tc, events);
                if let Some(args) = tc
                    .function
                    .and_then(|f| f.arguments)
                    .filter(|a| !a.is_empty())
                {
                    events.push(StreamEvent::ToolCallDelta { id, delta: args });
                }
            }

            if let Some(reason) = choice.finish_reason {
                self.close_call(events);
                let reason = match reason.as_str() {
                    "tool_calls" => StopReason::ToolUse,
                    "length" => StopReason::MaxTokens,
                    _ => StopReason::EndTurn,
                };
                self.done = true;
                events.push(StreamEvent::Done { reason });
            }
        }

        if let Some(usage) = chunk.usage {
            events.push(StreamEvent::Usage {
                input: usage.prompt_tokens,
                output: usage.completion_tokens,
            });
        }
    }

    /// Resolve the id for a tool-call delta, starting a new call when the
    /// stream index is new.
    fn call_id(&mut self, tc: &OpenAiToolCallDelta, events: &mut Vec<StreamEvent>) -> String {
        let index = tc.index.unwrap_or(0);
        if let Some((_, id)) = self.calls.iter().find(|(i, _)| *i == index) {
            return id.clone();
        }

        let id = tc
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("call_{index}"));
        let name = tc
            .function
            .as_ref()
            .and_then(|f| f.name.clone())
            .unwrap_or_default();

        self.close_call(events);
        self.calls.push((index, id.clone()));
        self.open_call = Some(id.clone());
        events.push(StreamEvent::ToolCallStart {
            id: id.clone(),
            name,
        });
        id
    }

    fn close_call(&mut self, events: &mut Vec<StreamEvent>) {
        if let Some(id) = self.open_call.take() {
            events.push(StreamEvent::ToolCallEnd { id });
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.provider_name
    }

    fn models(&self) -> Vec<ModelInfo> {
        self.config.models.clone()
    }

    fn current_model(&self) -> &str {
        &self.model
    }

    fn set_model(&mut self, model: &str) -> Result<(), ProviderError> {
        if self.config.accept_any_model || self.config.models.iter().any(|m| m.id == model) {
            self.model = model.to_string();
            Ok(())
        } else {
            Err(ProviderError::InvalidModel(model.to_string()))
        }
    }

    async fn stream(
        &self,
        request: Request,
    ) -> Result<BoxStream<'_, Result<StreamEvent, ProviderError>>, ProviderError> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        tracing::debug!(%url, model = %self.model, "sending chat request");

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.config.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.config.api_key));
        }
        let response = builder.send().await.map_err(ProviderError::Http)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth(format!("HTTP {status}: {body}")));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ProviderError::ApiError(format!("HTTP {status}: {body}")));
        }

        struct State {
            bytes: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
            decoder: SseDecoder,
            queue: VecDeque<StreamEvent>,
            ended: bool,
        }

        let state = State {
            bytes: response
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()))
                .boxed(),
            decoder: SseDecoder::default(),
            queue: VecDeque::new(),
            ended: false,
        };

        let events = stream::unfold(state, |mut st| async move {
            loop {
                if let Some(event) = st.queue.pop_front() {
                    return Some((Ok(event), st));
                }
                if st.ended {
                    return None;
                }
                match st.bytes.next().await {
                    Some(Ok(chunk)) => {
                        let decoded = st.decoder.push(&chunk);
                        st.queue.extend(decoded);
                    }
                    Some(Err(err)) => {
                        st.ended = true;
                        return Some((Err(ProviderError::Http(err)), st));
                    }
                    None => {
                        st.ended = true;
                        let decoded = st.decoder.finish();
                        st.queue.extend(decoded);
                    }
                }
            }
        });

        Ok(events.boxed())
    }
}

// OpenAI response types for deserialization

#[derive(Debug, Deserialize)]
struct OpenAiChunk {
    #[serde(default)]
    choices: Vec<OpenAiChunkChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChunkChoice {
    #[serde(default)]
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCallDelta {
    #[serde(default)]
    index: Option<u64>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<OpenAiFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
