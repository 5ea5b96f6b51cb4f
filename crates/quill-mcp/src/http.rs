//! Streamable HTTP transport: JSON-RPC messages POSTed to a single endpoint,
//! answered either with a JSON body or a short server-sent event stream.

use crate::client::{match_response, Transport};
use crate::error::McpError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const SESSION_HEADER: &str = "Mcp-Session-Id";

pub(crate) struct HttpTransport {
    server_name: String,
    url: String,
    http: reqwest::Client,
    next_request_id: AtomicU64,
    session_id: Mutex<Option<String>>,
}

impl HttpTransport {
    pub(crate) fn new(server_name: &str, url: &str) -> Result<Self, McpError> {
        reqwest::Url::parse(url)
            .map_err(|e| McpError::InvalidConfig(format!("invalid MCP url '{url}': {e}")))?;
        Ok(Self {
            server_name: server_name.to_string(),
            url: url.to_string(),
            http: reqwest::Client::new(),
            next_request_id: AtomicU64::new(1),
            session_id: Mutex::new(None),
        })
    }

    fn http_error(&self, err: impl std::fmt::Display) -> McpError {
        McpError::Http {
            server: self.server_name.clone(),
            message: err.to_string(),
        }
    }

    fn current_session(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|id| id.clone())
    }

    async fn post(
        &self,
        message: &Value,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, McpError> {
        let mut builder = self
            .http
            .post(&self.url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(message);
        if let Some(session) = self.current_session() {
            builder = builder.header(SESSION_HEADER, session);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                McpError::Timeout {
                    server: self.server_name.clone(),
                    seconds: timeout.map(|t| t.as_secs()).unwrap_or_default(),
                }
            } else {
                self.http_error(e)
            }
        })?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if let Ok(mut slot) = self.session_id.lock() {
                *slot = Some(session.to_string());
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.http_error(format!("status {status}: {}", body.trim())));
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, McpError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let message = json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "method": method,
            "params": params,
        });

        let response = self.post(&message, Some(timeout)).await?;
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));
        let body = response.text().await.map_err(|e| self.http_error(e))?;

        let messages = if is_event_stream {
            parse_sse_messages(&body)
        } else {
            let value: Value = serde_json::from_str(&body).map_err(|e| McpError::Json {
                server: self.server_name.clone(),
                message: e.to_string(),
            })?;
            match value {
                Value::Array(batch) => batch,
                single => vec![single],
            }
        };

        messages
            .iter()
            .find_map(|m| match_response(&self.server_name, m, request_id))
            .unwrap_or_else(|| {
                Err(McpError::InvalidResponse {
                    server: self.server_name.clone(),
                    message: format!("no response for request {request_id} ({method})"),
                })
            })
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), McpError> {
        let message = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.post(&message, None).await.map(|_| ())
    }

    fn server_name(&self) -> &str {
        &self.server_name
    }
}

/// Collect the JSON payloads of every event in a server-sent event body.
///
/// Multi-line `data:` fields are joined with `\n`; events whose data is not
/// JSON are skipped.
pub(crate) fn parse_sse_messages(body: &str) -> Vec<Value> {
    let mut messages = Vec::new();
    let mut data = String::new();

    let mut flush = |data: &mut String| {
        if !data.is_empty() {
            match serde_json::from_str(data) {
                Ok(value) => messages.push(value),
                Err(err) => tracing::debug!(error = %err, "skipping non-JSON SSE event"),
            }
            data.clear();
        }
    };

    for line in body.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            flush(&mut data);
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    flush(&mut data);

    messages
}
