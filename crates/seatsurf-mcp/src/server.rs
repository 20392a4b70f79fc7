//! MCP Server
//!
//! Handles the MCP protocol over stdio, processing JSON-RPC 2.0 messages.
//! Tool calls run as separate tasks; every response goes through one writer
//! task so lines on stdout never interleave.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::handler::ToolHandler;
use crate::protocol::{
    CallToolParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    ServerCapabilities, ServerInfo, ToolsCapability, INTERNAL_ERROR, INVALID_PARAMS,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::tools::all_tools;

/// Name announced in `initialize`
pub const SERVER_NAME: &str = "seatsurfing";

/// MCP Server that communicates over stdio
pub struct McpServer {
    handler: Arc<ToolHandler>,
}

impl McpServer {
    pub fn new(handler: Arc<ToolHandler>) -> Self {
        Self { handler }
    }

    /// Run the server, reading from stdin and writing to stdout
    pub async fn run(&self) -> anyhow::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serve line-delimited JSON-RPC until the reader hits EOF.
    ///
    /// Returns once every in-flight tool call has answered.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_responses(rx, writer));

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("Received: {}", line);
            self.handle_message(line, &tx);
        }

        // EOF - client disconnected
        info!("Client disconnected");
        drop(tx);
        writer_task.await??;

        Ok(())
    }

    /// Handle a single JSON-RPC message
    fn handle_message(&self, message: &str, tx: &mpsc::UnboundedSender<JsonRpcResponse>) {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                send(tx, JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {}", e)));
                return;
            }
        };

        // Handle notifications (no id means no response expected)
        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return;
        };

        if request.method == "tools/call" {
            self.spawn_call_tool(id, request.params, tx.clone());
            return;
        }

        let response = match self.handle_request(&request.method, request.params) {
            Ok(value) => JsonRpcResponse::success(Some(id), value),
            Err((code, message)) => JsonRpcResponse::error(Some(id), code, message),
        };
        send(tx, response);
    }

    /// Handle a notification (no response expected)
    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => info!("Client initialized"),
            "notifications/cancelled" => debug!("Request cancelled"),
            _ => debug!("Unknown notification: {}", method),
        }
    }

    /// Handle a request and return the result
    fn handle_request(&self, method: &str, params: Option<Value>) -> Result<Value, (i32, String)> {
        match method {
            "initialize" => self.handle_initialize(params),
            "tools/list" => self.handle_list_tools(),
            "ping" => Ok(json!({})),
            _ => {
                warn!("Unknown method: {}", method);
                Err((METHOD_NOT_FOUND, format!("Method not found: {}", method)))
            }
        }
    }

    /// Handle the initialize request
    fn handle_initialize(&self, _params: Option<Value>) -> Result<Value, (i32, String)> {
        info!("Initializing MCP server");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        serde_json::to_value(result)
            .map_err(|e| (INTERNAL_ERROR, format!("Serialization error: {}", e)))
    }

    /// Handle the tools/list request
    fn handle_list_tools(&self) -> Result<Value, (i32, String)> {
        let result = ListToolsResult { tools: all_tools() };

        serde_json::to_value(result)
            .map_err(|e| (INTERNAL_ERROR, format!("Serialization error: {}", e)))
    }

    /// Handle the tools/call request on its own task
    fn spawn_call_tool(
        &self,
        id: Value,
        params: Option<Value>,
        tx: mpsc::UnboundedSender<JsonRpcResponse>,
    ) {
        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                send(&tx, JsonRpcResponse::error(Some(id), INVALID_PARAMS, format!("Invalid params: {}", e)));
                return;
            }
            None => {
                send(&tx, JsonRpcResponse::error(Some(id), INVALID_PARAMS, "Missing params".to_string()));
                return;
            }
        };

        let handler = Arc::clone(&self.handler);
        tokio::spawn(async move {
            info!("Calling tool: {}", params.name);
            let result = handler.handle(&params.name, params.arguments).await;

            let response = match serde_json::to_value(result) {
                Ok(value) => JsonRpcResponse::success(Some(id), value),
                Err(e) => JsonRpcResponse::error(Some(id), INTERNAL_ERROR, format!("Serialization error: {}", e)),
            };
            send(&tx, response);
        });
    }
}

fn send(tx: &mpsc::UnboundedSender<JsonRpcResponse>, response: JsonRpcResponse) {
    if tx.send(response).is_err() {
        warn!("Response dropped, writer has stopped");
    }
}

async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
    mut writer: W,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(resp) = rx.recv().await {
        let resp_str = serde_json::to_string(&resp)?;
        debug!("Sending: {}", resp_str);
        writer.write_all(resp_str.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatsurf_core::{CacheStore, CredentialResolver, Paths, SessionManager};
    use std::collections::HashMap;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn server(dir: &TempDir) -> McpServer {
        let paths = Paths::at(dir.path());
        let handler = ToolHandler::with_parts(
            Arc::new(SessionManager::new()),
            CredentialResolver::new(&paths).with_env(HashMap::new()),
            CacheStore::new(&paths),
        );
        McpServer::new(Arc::new(handler))
    }

    /// Feed `input` to a fresh server and collect every response line
    async fn exchange(input: &str) -> Vec<Value> {
        let dir = TempDir::new().unwrap();
        let (writer, mut client) = tokio::io::duplex(1 << 20);

        server(&dir).serve(input.as_bytes(), writer).await.unwrap();

        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();
        output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn by_id(responses: &[Value], id: i64) -> &Value {
        responses
            .iter()
            .find(|r| r["id"] == json!(id))
            .unwrap_or_else(|| panic!("no response with id {}", id))
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let responses = exchange(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#, "\n",
        ))
        .await;

        assert_eq!(responses.len(), 3);

        let init = by_id(&responses, 1);
        assert_eq!(init["result"]["serverInfo"]["name"], "seatsurfing");
        assert_eq!(init["result"]["protocolVersion"], PROTOCOL_VERSION);

        let tools = by_id(&responses, 2)["result"]["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), all_tools().len());
        assert!(tools.iter().any(|t| t["name"] == "seatsurfing_create_booking"));

        assert_eq!(by_id(&responses, 3)["result"], json!({}));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let responses = exchange(concat!(
            "not json\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call"}"#, "\n",
        ))
        .await;

        assert_eq!(responses.len(), 3);
        assert!(responses
            .iter()
            .any(|r| r["id"].is_null() && r["error"]["code"] == json!(PARSE_ERROR)));
        assert_eq!(by_id(&responses, 4)["error"]["code"], json!(METHOD_NOT_FOUND));
        assert_eq!(by_id(&responses, 5)["error"]["code"], json!(INVALID_PARAMS));
    }

    #[tokio::test]
    async fn test_tool_failures_are_results() {
        let responses = exchange(concat!(
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"seatsurfing_list_locations"}}"#, "\n",
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#, "\n",
        ))
        .await;

        let locations = &by_id(&responses, 6)["result"];
        assert_eq!(locations["isError"], json!(true));
        assert!(locations["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("Error: Not authenticated"));

        let unknown = &by_id(&responses, 7)["result"];
        assert_eq!(unknown["isError"], json!(true));
        assert_eq!(unknown["content"][0]["text"], "Unknown tool: nope");
    }
}
