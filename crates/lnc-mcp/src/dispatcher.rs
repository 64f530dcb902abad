//! JSON-RPC 2.0 dispatcher.
//!
//! Parses one line of input, routes it to a built-in method or to the
//! tool registry, and wraps the outcome in a response. Notifications are
//! accepted and produce no response. Tool failures are reported as
//! `isError` results so the client model can read them; only malformed
//! requests produce JSON-RPC errors.

use lnc_core::RequestContext;
use serde_json::{json, Value};
use tracing::{debug, info, warn, Instrument};

use crate::error::{McpError, McpResult};
use crate::server::McpServer;
use crate::types::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallParams, ToolCallResult,
    PROTOCOL_VERSION,
};

/// Parse a raw JSON string into a JsonRpcRequest.
pub fn parse_jsonrpc_request(raw: &str) -> McpResult<JsonRpcRequest> {
    let value: Value = serde_json::from_str(raw)?;
    request_from_value(value)
}

fn request_from_value(value: Value) -> McpResult<JsonRpcRequest> {
    let request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|e| McpError::InvalidJsonRpc(format!("failed to parse JSON-RPC: {}", e)))?;

    if request.jsonrpc != "2.0" {
        return Err(McpError::InvalidJsonRpc(
            "jsonrpc field must be \"2.0\"".into(),
        ));
    }

    Ok(request)
}

fn error_response(id: Value, e: &McpError) -> JsonRpcResponse {
    JsonRpcResponse::error(id, JsonRpcError::from(e))
}

/// Dispatch one raw JSON-RPC message.
///
/// Returns `None` for notifications. Never fails: errors are wrapped in
/// error responses.
pub async fn dispatch_jsonrpc(server: &McpServer, raw: &str) -> Option<JsonRpcResponse> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return Some(error_response(Value::Null, &McpError::from(e))),
    };
    let fallback_id = value.get("id").cloned().unwrap_or(Value::Null);

    let request = match request_from_value(value) {
        Ok(r) => r,
        Err(e) => return Some(error_response(fallback_id, &e)),
    };

    if request.is_notification() {
        debug!(method = %request.method, "notification received");
        return None;
    }
    let id = request.id.clone().unwrap_or(Value::Null);

    let outcome = match request.method.as_str() {
        "initialize" => Ok(handle_initialize(server)),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(handle_tools_list(server)),
        "tools/call" => handle_tools_call(server, request.params).await,
        other => Err(McpError::MethodNotFound(other.to_string())),
    };

    Some(match outcome {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(e) => error_response(id, &e),
    })
}

fn handle_initialize(server: &McpServer) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": server.config().server_name,
            "version": server.config().server_version
        }
    })
}

fn handle_tools_list(server: &McpServer) -> Value {
    json!({ "tools": server.registry().descriptors() })
}

async fn handle_tools_call(server: &McpServer, params: Value) -> McpResult<Value> {
    let ToolCallParams { name, arguments } = serde_json::from_value(params)
        .map_err(|e| McpError::InvalidRequest(format!("invalid tools/call params: {}", e)))?;

    let descriptor = server
        .registry()
        .get(&name)
        .ok_or_else(|| McpError::ToolNotFound(name.clone()))?;
    let timeout = descriptor
        .timeout
        .unwrap_or_else(|| server.config().tool_timeout());

    let ctx = RequestContext::new(name.clone())
        .with_timeout(timeout)
        .with_shutdown(server.shutdown_signal());
    let span = ctx.span();

    let result = async {
        debug!(timeout_ms = timeout.as_millis() as u64, "tool call started");
        let outcome = server
            .registry()
            .call(&name, &ctx, arguments)
            .await;
        let elapsed_ms = ctx.elapsed().as_millis() as u64;
        match outcome {
            Ok(value) => {
                info!(elapsed_ms, "tool call succeeded");
                Ok(ToolCallResult::json(&value))
            }
            Err(McpError::Tool(e)) => {
                warn!(
                    elapsed_ms,
                    error = %e,
                    error_code = %e.code(),
                    cancelled = e.is_cancellation(),
                    "tool call failed"
                );
                Ok(ToolCallResult::error(e.to_string()))
            }
            Err(other) => Err(other),
        }
    }
    .instrument(span)
    .await?;

    Ok(serde_json::to_value(result)?)
}
