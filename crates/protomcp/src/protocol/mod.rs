//! MCP Protocol Dispatch
//!
//! Routes JSON-RPC methods to their handlers. Stateless: every message is
//! handled on its own, and the registry is the only shared state consulted.
//!
//! Implements OpenTelemetry JSON-RPC semantic conventions for observability.
//! See: https://opentelemetry.io/docs/specs/semconv/rpc/json-rpc/

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::Instrument;

use crate::registry::ToolRegistry;
use crate::types::error::ErrorData;
use crate::types::jsonrpc::{JsonRpcMessage, JsonRpcResponse};
use crate::types::protocol::{Implementation, InitializeResult, ServerCapabilities};
use crate::types::tool::{CallToolParams, CallToolResult, ListToolsResult};

/// Side-effect hook run on every decoded message before dispatch.
pub type RequestObserver = Arc<dyn Fn(&JsonRpcMessage) + Send + Sync>;

/// Serves `initialize`, `tools/list` and `tools/call` against a registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    server_info: Implementation,
    observer: Option<RequestObserver>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, server_info: Implementation) -> Self {
        Self {
            registry,
            server_info,
            observer: None,
        }
    }

    /// Install a request observer.
    ///
    /// It runs synchronously for every message, notifications included. A
    /// panic inside it is logged and dispatch continues.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&JsonRpcMessage) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    /// Dispatch one message.
    ///
    /// Returns `None` for notifications, which never get a response body.
    ///
    /// Creates an OpenTelemetry span following JSON-RPC semantic conventions:
    /// - `rpc.system` = "jsonrpc"
    /// - `rpc.method` = the JSON-RPC method name
    /// - `rpc.jsonrpc.version` = "2.0"
    /// - `rpc.jsonrpc.request_id` = the request ID
    pub async fn dispatch(&self, message: &JsonRpcMessage) -> Option<JsonRpcResponse> {
        self.observe(message);

        let id = match &message.id {
            Some(id) if message.method != "notifications/initialized" => id.clone(),
            _ => {
                tracing::debug!(method = %message.method, "notification received");
                return None;
            }
        };

        let span = tracing::info_span!(
            "mcp.dispatch",
            rpc.system = "jsonrpc",
            rpc.method = %message.method,
            rpc.jsonrpc.version = "2.0",
            rpc.jsonrpc.request_id = %id,
            // Error fields - recorded on failure
            error.type = tracing::field::Empty,
            rpc.jsonrpc.error_code = tracing::field::Empty,
            rpc.jsonrpc.error_message = tracing::field::Empty,
        );

        async {
            let response = match self.dispatch_inner(message).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(error) => {
                    record_error_on_span(&error);
                    JsonRpcResponse::failure(Some(id), error)
                }
            };
            Some(response)
        }
        .instrument(span)
        .await
    }

    fn observe(&self, message: &JsonRpcMessage) {
        let Some(observer) = &self.observer else {
            return;
        };
        if std::panic::catch_unwind(AssertUnwindSafe(|| observer(message))).is_err() {
            tracing::warn!(method = %message.method, "request observer panicked");
        }
    }

    async fn dispatch_inner(&self, message: &JsonRpcMessage) -> Result<Value, ErrorData> {
        match message.method.as_str() {
            "initialize" => to_result(&InitializeResult::new(
                self.server_info.clone(),
                ServerCapabilities::default().enable_tools(),
            )),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(message).await,
            _ => Err(ErrorData::method_not_found(&message.method)),
        }
    }

    fn handle_list_tools(&self) -> Result<Value, ErrorData> {
        let tools = self
            .registry
            .snapshot()
            .iter()
            .map(|definition| definition.to_tool())
            .collect();
        to_result(&ListToolsResult::all(tools))
    }

    async fn handle_call_tool(&self, message: &JsonRpcMessage) -> Result<Value, ErrorData> {
        let params = CallToolParams::from_params(message.params.as_ref());
        let name = params.name.ok_or_else(ErrorData::missing_tool_name)?;
        let tool = self
            .registry
            .get(&name)
            .ok_or_else(|| ErrorData::tool_not_found(&name))?;

        // Create child span for tool execution with MCP-specific attributes
        let tool_span = tracing::info_span!("mcp.tool.call", mcp.tool.name = %name);

        async {
            let outcome = AssertUnwindSafe(tool.invoker.invoke(params.arguments))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(value)) => to_result(&CallToolResult::from_value(value)),
                Ok(Err(error)) => {
                    tracing::warn!(error = %error, "tool call failed");
                    Err(error.to_error_data())
                }
                Err(_) => {
                    tracing::error!("tool invoker panicked");
                    Err(ErrorData::tool_execution("tool invoker panicked"))
                }
            }
        }
        .instrument(tool_span)
        .await
    }
}

fn to_result<T: Serialize>(result: &T) -> Result<Value, ErrorData> {
    serde_json::to_value(result)
        .map_err(|e| ErrorData::internal_error(format!("failed to serialize result: {}", e)))
}

/// Record JSON-RPC error on the current span following OTEL conventions.
fn record_error_on_span(error: &ErrorData) {
    let span = tracing::Span::current();
    span.record("error.type", error_type_for_code(error.code));
    span.record("rpc.jsonrpc.error_code", error.code);
    span.record("rpc.jsonrpc.error_message", error.message.as_str());
}

/// Map JSON-RPC error codes to error.type values.
fn error_type_for_code(code: i32) -> &'static str {
    match code {
        ErrorData::PARSE_ERROR => "parse_error",
        ErrorData::INVALID_REQUEST => "invalid_request",
        ErrorData::METHOD_NOT_FOUND => "method_not_found",
        ErrorData::INVALID_PARAMS => "invalid_params",
        ErrorData::INTERNAL_ERROR => "internal_error",
        ErrorData::TOOL_EXECUTION_ERROR => "tool_execution_error",
        _ => "application_error",
    }
}

/// Stock observer: logs the method, and the tool name for `tools/call`.
pub fn log_request(message: &JsonRpcMessage) {
    if message.method == "tools/call" {
        match message
            .params_object()
            .and_then(|params| params.get("name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
        {
            Some(name) => tracing::info!("MCP tools/call {}", name),
            None => tracing::info!("MCP tools/call"),
        }
        return;
    }
    tracing::info!("MCP {}", message.method);
}
