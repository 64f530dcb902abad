//! McpServer struct and initialization.

use tokio::sync::watch;

use crate::error::{McpError, McpResult};
use crate::registry::ToolRegistry;
use crate::types::McpServerConfig;

/// The MCP server instance.
///
/// Owns the tool registry and the shutdown signal handed to every request
/// context. Created via [`initialize_server`].
pub struct McpServer {
    config: McpServerConfig,
    registry: ToolRegistry,
    shutdown: watch::Receiver<bool>,
}

impl McpServer {
    pub fn new(
        config: McpServerConfig,
        registry: ToolRegistry,
        shutdown: watch::Receiver<bool>,
    ) -> McpResult<Self> {
        if config.server_name.is_empty() {
            return Err(McpError::ConfigError(
                "server_name must not be empty".into(),
            ));
        }
        if config.tool_timeout_secs == 0 {
            return Err(McpError::ConfigError(
                "tool_timeout_secs must be greater than 0".into(),
            ));
        }
        if registry.is_empty() {
            return Err(McpError::InitializationFailed(
                "no tools registered".into(),
            ));
        }

        Ok(Self {
            config,
            registry,
            shutdown,
        })
    }

    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// A receiver for the shutdown broadcast.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Initialize an MCP server with the given configuration and tools.
pub fn initialize_server(
    config: McpServerConfig,
    registry: ToolRegistry,
    shutdown: watch::Receiver<bool>,
) -> McpResult<McpServer> {
    tracing::info!(
        server_name = %config.server_name,
        server_version = %config.server_version,
        tools = registry.len(),
        access_mode = ?registry.mode(),
        "initializing MCP server"
    );

    let server = McpServer::new(config, registry, shutdown)?;

    tracing::info!("MCP server initialized successfully");

    Ok(server)
}
