//! MCP error types.
//!
//! Protocol faults map to JSON-RPC error codes. Tool failures travel as
//! [`McpError::Tool`] and are reported to clients as `isError` tool
//! results, never as protocol errors.

use lnc_core::LncError;
use thiserror::Error;

/// Result type alias for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

#[derive(Debug, Error)]
pub enum McpError {
    // -- Transport / initialization errors --
    #[error("server initialization failed: {0}")]
    InitializationFailed(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    // -- Dispatch errors --
    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid JSON-RPC request: {0}")]
    InvalidJsonRpc(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown tool: {0}")]
    ToolNotFound(String),

    // -- Registry errors --
    #[error("duplicate tool registration: {0}")]
    DuplicateTool(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    // -- Tool execution --
    #[error(transparent)]
    Tool(#[from] LncError),

    // -- Serialization --
    #[error("parse error: {0}")]
    SerializationError(String),
}

impl McpError {
    /// Returns a JSON-RPC error code for this error variant.
    pub fn json_rpc_code(&self) -> i64 {
        match self {
            McpError::InvalidJsonRpc(_) => -32600,
            McpError::MethodNotFound(_) => -32601,
            McpError::InvalidRequest(_) | McpError::ToolNotFound(_) => -32602,
            McpError::SerializationError(_) => -32700,
            McpError::AccessDenied(_) => -32003,
            _ => -32000,
        }
    }
}

impl From<serde_json::Error> for McpError {
    fn from(e: serde_json::Error) -> Self {
        McpError::SerializationError(e.to_string())
    }
}
