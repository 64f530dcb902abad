//! MCP server for read-only Lightning node queries.
//!
//! Speaks line-delimited JSON-RPC 2.0 and exposes the node through a fixed
//! set of tools. Every tool is registered with its access level; the
//! registry refuses anything that could move funds or change node state.
//!
//! # Flow
//!
//! ```text
//! raw line -> dispatch_jsonrpc -> ToolRegistry::call -> ToolService -> ConnectionSlot -> node
//! ```

pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod server;
pub mod tools;
pub mod types;
pub mod wire;

pub use dispatcher::{dispatch_jsonrpc, parse_jsonrpc_request};
pub use error::{McpError, McpResult};
pub use registry::{AccessMode, ToolRegistry, ToolService};
pub use server::{initialize_server, McpServer};
pub use tools::read_only_services;
pub use types::{
    Access, JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpServerConfig, ToolCallResult,
    ToolDescriptor, PROTOCOL_VERSION,
};
