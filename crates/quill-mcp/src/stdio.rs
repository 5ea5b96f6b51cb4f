//! Newline-delimited JSON-RPC over a child process's stdio.

use crate::client::{match_response, Transport};
use crate::error::McpError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

pub(crate) struct StdioTransport {
    server_name: String,
    conn: Mutex<Connection>,
}

struct Connection {
    // Held so the process is killed when the transport is dropped.
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_request_id: u64,
    // Set when a read was abandoned mid-line; the stream is out of sync.
    broken: bool,
}

impl StdioTransport {
    pub(crate) fn spawn(
        server_name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        cwd: Option<&Path>,
    ) -> Result<Self, McpError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|err| McpError::Spawn {
            server: server_name.to_string(),
            message: format!("{command}: {err}"),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| McpError::Spawn {
            server: server_name.to_string(),
            message: "child stdin was not piped".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| McpError::Spawn {
            server: server_name.to_string(),
            message: "child stdout was not piped".to_string(),
        })?;
        if let Some(stderr) = child.stderr.take() {
            let name = server_name.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => {
                            tracing::debug!(server = %name, stderr = %line, "mcp stderr");
                        }
                        Ok(None) => break,
                        Err(err) => {
                            tracing::debug!(server = %name, error = %err, "failed to read mcp stderr");
                            break;
                        }
                    }
                }
            });
        }

        tracing::debug!(server = %server_name, command, "spawned MCP server");
        Ok(Self {
            server_name: server_name.to_string(),
            conn: Mutex::new(Connection {
                _child: child,
                stdin,
                stdout: BufReader::new(stdout),
                next_request_id: 1,
                broken: false,
            }),
        })
    }

    fn io_error(&self, err: std::io::Error) -> McpError {
        McpError::Io {
            server: self.server_name.clone(),
            message: err.to_string(),
        }
    }

    async fn write_message(&self, conn: &mut Connection, message: &Value) -> Result<(), McpError> {
        let mut payload = serde_json::to_vec(message).map_err(|err| McpError::Json {
            server: self.server_name.clone(),
            message: err.to_string(),
        })?;
        payload.push(b'\n');
        conn.stdin
            .write_all(&payload)
            .await
            .map_err(|e| self.io_error(e))?;
        conn.stdin.flush().await.map_err(|e| self.io_error(e))
    }

    async fn read_message(&self, conn: &mut Connection) -> Result<Value, McpError> {
        let mut line = String::new();
        loop {
            line.clear();
            let bytes = conn
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| self.io_error(e))?;
            if bytes == 0 {
                return Err(McpError::ConnectionClosed(self.server_name.clone()));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed).map_err(|err| McpError::Json {
                server: self.server_name.clone(),
                message: err.to_string(),
            });
        }
    }

    async fn await_response(
        &self,
        conn: &mut Connection,
        request_id: u64,
    ) -> Result<Value, McpError> {
        loop {
            let message = self.read_message(conn).await?;

            // Requests from the server (sampling, roots, ...) are refused.
            if let (Some(method), Some(id)) = (
                message.get("method").and_then(Value::as_str),
                message.get("id"),
            ) {
                let refusal = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {
                        "code": -32601,
                        "message": format!("quill does not implement MCP client method '{method}'"),
                    }
                });
                self.write_message(conn, &refusal).await?;
                continue;
            }

            if let Some(result) = match_response(&self.server_name, &message, request_id) {
                return result;
            }
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn request(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, McpError> {
        let mut conn = self.conn.lock().await;
        if conn.broken {
            return Err(McpError::Broken(self.server_name.clone()));
        }
        let request_id = conn.next_request_id;
        conn.next_request_id += 1;

        let message = json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "method": method,
            "params": params,
        });
        self.write_message(&mut conn, &message).await?;

        match tokio::time::timeout(timeout, self.await_response(&mut conn, request_id)).await {
            Ok(result) => result,
            Err(_) => {
                // `read_line` may have consumed part of a message.
                conn.broken = true;
                tracing::warn!(server = %self.server_name, method, "MCP request timed out, dropping connection");
                Err(McpError::Timeout {
                    server: self.server_name.clone(),
                    seconds: timeout.as_secs(),
                })
            }
        }
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), McpError> {
        let mut conn = self.conn.lock().await;
        if conn.broken {
            return Err(McpError::Broken(self.server_name.clone()));
        }
        let message = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.write_message(&mut conn, &message).await
    }

    fn server_name(&self) -> &str {
        &self.server_name
    }
}

#[cfg(all(test, unix))]
mod tests {
    use crate::{McpClient, McpError, ServerConfig, TransportConfig};
    use std::collections::HashMap;
    use std::time::Duration;

    // Replies by position: initialize, (initialized notification), tools/list, tools/call.
    const FAKE_SERVER: &str = r#"
read line
echo '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2025-06-18","capabilities":{},"serverInfo":{"name":"fake","version":"0"}}}'
read line
read line
echo '{"jsonrpc":"2.0","method":"notifications/message","params":{}}'
echo '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"echo","description":"Echo text","inputSchema":{"type":"object"}}]}}'
read line
echo '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"hello back"}]}}'
"#;

    fn shell_server(script: &str) -> ServerConfig {
        ServerConfig {
            name: "fake".to_string(),
            transport: TransportConfig::Stdio {
                command: "/bin/sh".to_string(),
                args: vec!["-c".to_string(), script.to_string()],
                env: HashMap::new(),
                cwd: None,
            },
            startup_timeout: Duration::from_secs(5),
            tool_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_stdio_handshake_list_and_call() {
        let (client, tools) = McpClient::connect(shell_server(FAKE_SERVER)).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");
        assert_eq!(tools[0].description, "Echo text");

        let result = client
            .call_tool("echo", serde_json::json!({"text": "hello"}))
            .await
            .unwrap();
        assert_eq!(result.text, "hello back");
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_stdio_server_exit_is_connection_closed() {
        let err = McpClient::connect(shell_server("exit 0")).await.unwrap_err();
        assert!(
            matches!(err, McpError::ConnectionClosed(_) | McpError::Io { .. }),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_timed_out_connection_is_not_reused() {
        let script = r#"
read line
echo '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2025-06-18","capabilities":{},"serverInfo":{"name":"slow","version":"0"}}}'
read line
read line
echo '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"echo","inputSchema":{"type":"object"}}]}}'
read line
printf '{"jsonrpc":"2.0",'
sleep 5
"#;
        let mut config = shell_server(script);
        config.tool_timeout = Duration::from_millis(300);
        let (client, _) = McpClient::connect(config).await.unwrap();

        let first = client.call_tool("echo", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(first, McpError::Timeout { .. }), "unexpected error: {first:?}");

        let second = client.call_tool("echo", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(second, McpError::Broken(_)), "unexpected error: {second:?}");
    }

    #[tokio::test]
    async fn test_missing_command_is_spawn_error() {
        let mut config = shell_server("");
        config.transport = TransportConfig::Stdio {
            command: "/nonexistent/quill-mcp-server".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        };
        let err = McpClient::connect(config).await.unwrap_err();
        assert!(matches!(err, McpError::Spawn { .. }));
    }
}
