//! MCP request dispatcher shared by all transports.

use crate::mcp::protocol::{
    INVALID_PARAMS, INVALID_REQUEST, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::tools::{ToolContext, ToolRegistry};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dispatches JSON-RPC requests to the tool registry.
#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    context: ToolContext,
    name: String,
    version: String,
}

impl McpServer {
    /// Create a server named after this crate.
    pub fn new(registry: ToolRegistry, context: ToolContext) -> Self {
        Self {
            registry: Arc::new(registry),
            context,
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the name and version reported by `initialize`.
    pub fn with_server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.name = name.into();
        self.version = version.into();
        self
    }

    /// The tool registry.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The tool context.
    pub fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Handle one raw message (a request object or a batch array).
    ///
    /// Returns the serialized reply, or `None` when nothing should be sent back
    /// (notifications and batches made only of notifications).
    pub async fn handle_message(&self, raw: &str) -> Option<String> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("Unparseable message: {}", e);
                let response =
                    JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e));
                return serde_json::to_string(&response).ok();
            }
        };

        let reply = match value {
            Value::Array(items) if items.is_empty() => Some(json!(JsonRpcResponse::error(
                Value::Null,
                INVALID_REQUEST,
                "Invalid Request: empty batch",
            ))),
            Value::Array(items) => {
                let mut responses = Vec::new();
                for item in items {
                    if let Some(response) = self.handle_value(item).await {
                        responses.push(response);
                    }
                }
                (!responses.is_empty()).then(|| json!(responses))
            }
            item => self.handle_value(item).await.map(|r| json!(r)),
        };

        reply.and_then(|r| serde_json::to_string(&r).ok())
    }

    async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Invalid Request: {}", e),
            )),
        }
    }

    /// Handle a parsed request. Notifications produce no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            ));
        }

        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return None;
        };

        debug!("Handling {} (id {})", request.method, id);
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result(&request.params)),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(
                id,
                json!({ "tools": self.registry.descriptors() }),
            ),
            "tools/call" => self.call_tool(id, request.params).await,
            other => {
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other))
            }
        };
        Some(response)
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => info!("Client initialized"),
            "notifications/cancelled" => debug!("Client cancelled a request"),
            other => debug!("Ignoring notification {}", other),
        }
    }

    fn initialize_result(&self, params: &Value) -> Value {
        if let Some(client) = params.get("clientInfo") {
            let client_name = client
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let requested = params
                .get("protocolVersion")
                .and_then(Value::as_str)
                .unwrap_or("-");
            info!(
                client = %client_name,
                requested_version = %requested,
                "Initializing session"
            );
        }
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": self.name,
                "version": self.version,
            }
        })
    }

    async fn call_tool(&self, id: Value, params: Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing tool name");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
        if !(arguments.is_object() || arguments.is_null()) {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Tool arguments must be an object");
        }

        match self.registry.call(&self.context, name, arguments).await {
            Some(output) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [{ "type": "text", "text": output.text }],
                    "isError": output.is_error,
                }),
            ),
            None => {
                warn!("Unknown tool requested: {}", name);
                JsonRpcResponse::error(id, INVALID_PARAMS, format!("Unknown tool: {}", name))
            }
        }
    }
}
