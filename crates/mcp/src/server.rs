// MCP server: newline-delimited JSON-RPC 2.0 over stdio

use crate::auth::AuthGate;
use crate::protocol::{
    negotiate_protocol_version, CallToolParams, CallToolResult, InitializeParams,
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    ServerCapabilities, ServerInfo, ToolsCapability,
};
use crate::tools::ToolRegistry;
use anyhow::Result;
use futures::SinkExt;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, BufReader};
use tokio_util::codec::{FramedWrite, LinesCodec};
use tracing::{debug, info, warn};

/// Longest accepted inbound message
const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

pub struct McpServer {
    registry: ToolRegistry,
    gate: Arc<dyn AuthGate>,
    info: ServerInfo,
    instructions: Option<String>,
    initialized: AtomicBool,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, gate: Arc<dyn AuthGate>) -> Self {
        Self {
            registry,
            gate,
            info: ServerInfo {
                name: "dmt-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: None,
            initialized: AtomicBool::new(false),
        }
    }

    /// Usage hints returned to the client in the `initialize` response
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Serve on stdin/stdout until EOF or Ctrl-C
    pub async fn start(&self) -> Result<()> {
        info!(tools = self.registry.len(), "MCP server listening on stdio");

        tokio::select! {
            result = self.serve(tokio::io::stdin(), tokio::io::stdout()) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                Ok(())
            }
        }
    }

    /// Serve one connection; messages are handled in arrival order
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut sink = FramedWrite::new(writer, LinesCodec::new());
        let mut buf = Vec::new();

        loop {
            let line = match read_message(&mut reader, &mut buf).await? {
                Inbound::Eof => break,
                Inbound::Oversized => {
                    warn!(max_bytes = MAX_MESSAGE_BYTES, "Dropping oversized message");
                    let response = JsonRpcResponse::error(
                        Value::Null,
                        JsonRpcError::parse_error("message exceeds maximum length"),
                    );
                    sink.send(serde_json::to_string(&response)?).await?;
                    continue;
                }
                Inbound::Line => match std::str::from_utf8(&buf) {
                    Ok(line) => line.trim_end_matches(['\n', '\r']),
                    Err(e) => {
                        let response = JsonRpcResponse::error(
                            Value::Null,
                            JsonRpcError::parse_error(format!("message is not valid UTF-8: {}", e)),
                        );
                        sink.send(serde_json::to_string(&response)?).await?;
                        continue;
                    }
                },
            };

            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(line).await {
                sink.send(serde_json::to_string(&response)?).await?;
            }
        }

        info!("stdin closed, MCP server shutting down");
        Ok(())
    }

    /// Handle one raw message; `None` when no response is due
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Malformed JSON-RPC message");
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        if value.is_array() {
            return Some(JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::invalid_request("Batch requests are not supported"),
            ));
        }

        // Responses to server-initiated requests; this server sends none
        if value.get("method").is_none()
            && (value.get("result").is_some() || value.get("error").is_some())
        {
            debug!("Ignoring JSON-RPC response from client");
            return None;
        }

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(format!("Invalid Request: {}", e)),
                ))
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Invalid Request: jsonrpc must be \"2.0\""),
            ));
        }

        self.handle_request(request).await
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        debug!(method = %request.method, "Handling request");

        let outcome = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "ping" => Ok(serde_json::json!({})),
            _ if !self.initialized.load(Ordering::SeqCst) => Err(JsonRpcError::not_initialized()),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => debug!("Client finished initialization"),
            "notifications/cancelled" => {
                // Requests are answered in order, so nothing is in flight to cancel
                debug!("Ignoring cancellation notice")
            }
            other => debug!(method = %other, "Ignoring notification"),
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)))?
            .ok_or_else(|| JsonRpcError::invalid_params("Missing initialize params"))?;

        let protocol_version = negotiate_protocol_version(&params.protocol_version);
        let client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown");
        info!(
            client = %client,
            requested = %params.protocol_version,
            negotiated = %protocol_version,
            "Client initialized"
        );

        self.initialized.store(true, Ordering::SeqCst);

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        };
        to_result(&result)
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        to_result(&ListToolsResult {
            tools: self.registry.list_schemas(),
        })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)))?
            .ok_or_else(|| JsonRpcError::invalid_params("Missing tools/call params"))?;

        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        // Nothing is forwarded without an authenticated session
        if let Err(e) = self.gate.ensure_authenticated().await {
            warn!(tool = %params.name, error = %e, "Rejecting tool call, not authenticated");
            return to_result(&CallToolResult::error(format!(
                "Not authenticated with the Management Presence Server: {:#}",
                e
            )));
        }

        let started = Instant::now();
        let arguments = params.arguments.unwrap_or_else(|| serde_json::json!({}));
        let result = match tool.execute(arguments).await {
            Ok(result) => result,
            Err(e) => CallToolResult::error(format!("{:#}", e)),
        };

        info!(
            tool = %params.name,
            tier = ?tool.tier(),
            is_error = result.is_error(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tool call finished"
        );

        to_result(&result)
    }
}

enum Inbound {
    /// A complete message is in the buffer
    Line,
    /// The message exceeded `MAX_MESSAGE_BYTES` and was skipped
    Oversized,
    Eof,
}

/// Read one newline-terminated message into `buf`, never holding more than
/// `MAX_MESSAGE_BYTES` of it in memory
async fn read_message<R>(reader: &mut BufReader<R>, buf: &mut Vec<u8>) -> std::io::Result<Inbound>
where
    R: AsyncRead + Unpin,
{
    buf.clear();
    let limit = MAX_MESSAGE_BYTES as u64 + 1;
    let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(Inbound::Eof);
    }
    if buf.last() == Some(&b'\n') || buf.len() <= MAX_MESSAGE_BYTES {
        return Ok(Inbound::Line);
    }

    // Skip the rest of the oversized line
    buf.clear();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(Inbound::Oversized);
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(Inbound::Oversized);
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

fn to_result<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ToolContent, ToolSchema};
    use crate::tools::{json_schema_object, json_schema_string, Tool};
    use std::sync::atomic::AtomicUsize;
    use tokio::io::AsyncWriteExt;

    struct StaticGate {
        allow: bool,
        checks: AtomicUsize,
    }

    impl StaticGate {
        fn new(allow: bool) -> Arc<Self> {
            Arc::new(Self {
                allow,
                checks: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl AuthGate for StaticGate {
        async fn ensure_authenticated(&self) -> Result<()> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            if self.allow {
                Ok(())
            } else {
                anyhow::bail!("Authentication failed: Incorrect Username and/or Password!")
            }
        }
    }

    struct CountingTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Tool for CountingTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "get_devices".to_string(),
                description: "Counts invocations".to_string(),
                input_schema: json_schema_object(
                    serde_json::json!({ "guid": json_schema_string("GUID") }),
                    vec![],
                ),
                annotations: None,
            }
        }

        async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if arguments.get("fail").is_some() {
                anyhow::bail!("tool blew up");
            }
            Ok(CallToolResult::text(format!("called with {}", arguments)))
        }
    }

    fn server_with(gate: Arc<dyn AuthGate>) -> (McpServer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CountingTool { calls: calls.clone() }));
        (McpServer::new(registry, gate), calls)
    }

    const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"inspector","version":"1.0"}}}"#;

    async fn initialized(server: &McpServer) {
        let response = server.handle_line(INITIALIZE).await.unwrap();
        assert!(response.error.is_none());
    }

    fn result_text(response: &JsonRpcResponse) -> String {
        let result: CallToolResult =
            serde_json::from_value(response.result.clone().unwrap()).unwrap();
        match &result.content[0] {
            ToolContent::Text { text } => text.clone(),
        }
    }

    #[tokio::test]
    async fn test_initialize_response() {
        let (server, _) = server_with(StaticGate::new(true));

        let response = server.handle_line(INITIALIZE).await.unwrap();
        let result = response.result.unwrap();

        assert_eq!(response.id, serde_json::json!(1));
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "dmt-mcp");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_requests_before_initialize_rejected() {
        let (server, calls) = server_with(StaticGate::new(true));

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_devices"}}"#)
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, -32002);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // ping is always allowed
        let ping = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(ping.result.unwrap(), serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_list_tools_enumerates_registered_tools() {
        let (server, _) = server_with(StaticGate::new(false));
        initialized(&server).await;

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":"list","method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();

        assert_eq!(response.id, serde_json::json!("list"));
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "get_devices");
        assert_eq!(tools[0]["annotations"]["readOnlyHint"], true);
    }

    #[tokio::test]
    async fn test_tool_call_rejected_when_unauthenticated() {
        let gate = StaticGate::new(false);
        let (server, calls) = server_with(gate.clone());
        initialized(&server).await;

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"get_devices","arguments":{}}}"#)
            .await
            .unwrap();

        let result = response.result.clone().unwrap();
        assert_eq!(result["isError"], true);
        assert!(result_text(&response).contains("Not authenticated"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(gate.checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tool_call_dispatched_when_authenticated() {
        let (server, calls) = server_with(StaticGate::new(true));
        initialized(&server).await;

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"get_devices","arguments":{"status":1}}}"#)
            .await
            .unwrap();

        assert!(response.result.as_ref().unwrap().get("isError").is_none());
        assert_eq!(result_text(&response), r#"called with {"status":1}"#);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tool_error_becomes_error_result() {
        let (server, _) = server_with(StaticGate::new(true));
        initialized(&server).await;

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"get_devices","arguments":{"fail":true}}}"#)
            .await
            .unwrap();

        assert_eq!(response.result.as_ref().unwrap()["isError"], true);
        assert_eq!(result_text(&response), "Error: tool blew up");
    }

    #[tokio::test]
    async fn test_unknown_tool_and_method() {
        let gate = StaticGate::new(true);
        let (server, _) = server_with(gate.clone());
        initialized(&server).await;

        let unknown_tool = server
            .handle_line(r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"format_disk"}}"#)
            .await
            .unwrap();
        assert_eq!(unknown_tool.error.unwrap().code, -32602);
        assert_eq!(gate.checks.load(Ordering::SeqCst), 0);

        let unknown_method = server
            .handle_line(r#"{"jsonrpc":"2.0","id":9,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(unknown_method.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_malformed_messages() {
        let (server, _) = server_with(StaticGate::new(true));

        let parse = server.handle_line("{not json").await.unwrap();
        assert_eq!(parse.error.unwrap().code, -32700);
        assert_eq!(parse.id, Value::Null);

        let no_method = server.handle_line(r#"{"jsonrpc":"2.0","id":4}"#).await.unwrap();
        assert_eq!(no_method.error.unwrap().code, -32600);
        assert_eq!(no_method.id, serde_json::json!(4));

        let bad_version = server
            .handle_line(r#"{"jsonrpc":"1.0","id":5,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(bad_version.error.unwrap().code, -32600);

        let batch = server.handle_line("[]").await.unwrap();
        assert_eq!(batch.error.unwrap().code, -32600);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let (server, _) = server_with(StaticGate::new(true));

        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none());
        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_serve_over_duplex_stream() {
        let (server, calls) = server_with(StaticGate::new(true));
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, mut client_write) = tokio::io::split(client_io);

        let serve = tokio::spawn(async move { server.serve(server_read, server_write).await });

        client_write.write_all(INITIALIZE.as_bytes()).await.unwrap();
        client_write.write_all(b"\n").await.unwrap();
        client_write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n\n")
            .await
            .unwrap();
        client_write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"get_devices\"}}\r\n")
            .await
            .unwrap();
        client_write.shutdown().await.unwrap();

        let mut lines = BufReader::new(client_read).lines();
        let first: JsonRpcResponse = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let second: JsonRpcResponse = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

        assert_eq!(first.id, serde_json::json!(1));
        assert_eq!(second.id, serde_json::json!(2));
        assert_eq!(result_text(&second), "called with {}");

        serve.await.unwrap().unwrap();
        assert!(lines.next_line().await.unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_serve_continues_after_oversized_message() {
        let (server, _) = server_with(StaticGate::new(true));
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, mut client_write) = tokio::io::split(client_io);

        let serve = tokio::spawn(async move { server.serve(server_read, server_write).await });

        let mut oversized = vec![b'x'; MAX_MESSAGE_BYTES + 10];
        oversized.push(b'\n');
        client_write.write_all(&oversized).await.unwrap();
        client_write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        client_write.shutdown().await.unwrap();

        let mut lines = BufReader::new(client_read).lines();
        let rejected: JsonRpcResponse = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let ping: JsonRpcResponse = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

        assert_eq!(rejected.id, Value::Null);
        assert_eq!(rejected.error.unwrap().code, -32700);
        assert_eq!(ping.id, serde_json::json!(9));
        assert_eq!(ping.result.unwrap(), serde_json::json!({}));

        serve.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_message_at_size_limit_accepted() {
        let mut reader = BufReader::new(std::io::Cursor::new({
            let mut bytes = vec![b' '; MAX_MESSAGE_BYTES];
            bytes.push(b'\n');
            bytes.extend_from_slice(b"{}");
            bytes
        }));
        let mut buf = Vec::new();

        assert!(matches!(read_message(&mut reader, &mut buf).await.unwrap(), Inbound::Line));
        assert_eq!(buf.len(), MAX_MESSAGE_BYTES + 1);

        // Final line without a newline
        assert!(matches!(read_message(&mut reader, &mut buf).await.unwrap(), Inbound::Line));
        assert_eq!(buf, b"{}");

        assert!(matches!(read_message(&mut reader, &mut buf).await.unwrap(), Inbound::Eof));
    }
}
