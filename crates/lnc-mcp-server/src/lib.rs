//! Process supervisor for the read-only Lightning Node Connect MCP server.
//!
//! Wires configuration into the tunnel negotiator, the connection slot and
//! the MCP tool registry, then serves line-delimited JSON-RPC until the
//! input closes or a stop signal arrives.
//!
//! # Architecture
//!
//! ```text
//! stdin lines -> one task per request -> dispatch_jsonrpc -> mpsc -> writer task -> stdout
//! ```
//!
//! Shutdown broadcasts cancellation to every in-flight request, waits for
//! their responses and flushes the writer, bounded by
//! `shutdown_timeout_secs`. Requests still running at the deadline are
//! aborted and joined before the node connection is closed.

pub mod config;
pub mod error;

use std::future::Future;
use std::sync::Arc;

use lnc_mcp::{initialize_server, read_only_services, AccessMode, McpServer, ToolRegistry};
use lnc_tunnel::{ConnectionSlot, MailboxDialer, TunnelNegotiator, UnlinkedMailbox};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub use config::{parse_duration, MailboxConfig, ServerConfig};
pub use error::{RootError, RootResult};

/// Responses waiting for the writer before request tasks block.
const RESPONSE_QUEUE: usize = 64;

/// Why the serve loop stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeExit {
    /// The input reached end of file.
    InputClosed,
    /// The stop future resolved, typically on SIGINT or SIGTERM.
    Stopped,
}

/// Runtime state of the server process.
pub struct Daemon {
    config: ServerConfig,
    server: Arc<McpServer>,
    slot: Arc<ConnectionSlot>,
    shutdown_tx: watch::Sender<bool>,
}

/// Build a daemon with the mailbox transport linked into this binary.
pub fn initialize_daemon(config: ServerConfig) -> RootResult<Daemon> {
    initialize_daemon_with(config, Arc::new(UnlinkedMailbox))
}

/// Build a daemon over an explicit mailbox dialer.
pub fn initialize_daemon_with(
    config: ServerConfig,
    dialer: Arc<dyn MailboxDialer>,
) -> RootResult<Daemon> {
    config.validate()?;

    info!(
        server_name = %config.server_name,
        mailbox = %config.mailbox.default_server,
        dev_mode = config.mailbox.dev_mode,
        connect_timeout_secs = config.mailbox.connect_timeout_secs,
        "initializing lnc-mcp-server"
    );
    if config.mailbox.max_retries > 0 {
        debug!(
            max_retries = config.mailbox.max_retries,
            "max_retries is accepted but negotiation makes a single attempt"
        );
    }

    let negotiator = Arc::new(TunnelNegotiator::new(dialer, config.negotiator_config()));
    let slot = Arc::new(ConnectionSlot::new());

    let mut registry = ToolRegistry::new(AccessMode::ReadOnly);
    for service in read_only_services(
        Arc::clone(&slot),
        negotiator,
        config.connect_tool_timeout(),
    ) {
        registry.register(service)?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = initialize_server(config.mcp_config(), registry, shutdown_rx)?;

    Ok(Daemon {
        config,
        server: Arc::new(server),
        slot,
        shutdown_tx,
    })
}

impl Daemon {
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn server(&self) -> &Arc<McpServer> {
        &self.server
    }

    pub fn slot(&self) -> &Arc<ConnectionSlot> {
        &self.slot
    }

    /// Serve stdin/stdout until EOF, SIGINT or SIGTERM.
    pub async fn run_stdio(&self) -> RootResult<ServeExit> {
        let reader = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout(), wait_for_signal())
            .await
    }

    /// Serve JSON-RPC lines from `reader` to `writer` until the input ends,
    /// `stop` resolves or reading fails, then shut down.
    ///
    /// The shutdown sequence runs on every exit path, including read errors.
    pub async fn serve<R, W, S>(&self, reader: R, writer: W, stop: S) -> RootResult<ServeExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::channel::<String>(RESPONSE_QUEUE);
        let writer_task = tokio::spawn(write_responses(writer, rx));
        let mut in_flight = JoinSet::new();
        let mut lines = reader.lines();
        tokio::pin!(stop);

        info!("serving JSON-RPC on stdio");

        let exit = loop {
            tokio::select! {
                _ = &mut stop => {
                    info!("stop signal received");
                    break Ok(ServeExit::Stopped);
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let server = Arc::clone(&self.server);
                        let tx = tx.clone();
                        in_flight.spawn(async move {
                            handle_line(&server, &line, &tx).await;
                        });
                    }
                    Ok(None) => {
                        info!("input closed");
                        break Ok(ServeExit::InputClosed);
                    }
                    Err(e) => {
                        error!(error = %e, "failed to read request");
                        break Err(RootError::Io(e));
                    }
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "request task failed");
                    }
                }
            }
        };

        self.shutdown(in_flight, tx, writer_task).await;
        exit
    }

    async fn shutdown(
        &self,
        mut in_flight: JoinSet<()>,
        tx: mpsc::Sender<String>,
        writer_task: tokio::task::JoinHandle<std::io::Result<()>>,
    ) {
        let pending = in_flight.len();
        info!(
            in_flight = pending,
            timeout_secs = self.config.shutdown_timeout_secs,
            "shutting down"
        );
        // Every request context observes this and cancels.
        let _ = self.shutdown_tx.send(true);

        let drain = async {
            while let Some(joined) = in_flight.join_next().await {
                if let Err(e) = joined {
                    error!(error = %e, "request task failed during shutdown");
                }
            }
            drop(tx);
            match writer_task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "response writer failed"),
                Err(e) => error!(error = %e, "response writer task failed"),
            }
        };
        if tokio::time::timeout(self.config.shutdown_timeout(), drain)
            .await
            .is_err()
        {
            warn!(
                remaining = in_flight.len(),
                "shutdown timed out; aborting in-flight requests"
            );
            // Aborted tasks drop what they hold, so an unclaimed node
            // connection is closed here rather than left open.
            in_flight.shutdown().await;
        }

        match self.slot.disconnect() {
            Ok(true) => info!("closed node connection"),
            Ok(false) => debug!("no node connection to close"),
            Err(e) => warn!(error = %e, "failed to close node connection"),
        }
        info!("shutdown complete");
    }
}

async fn handle_line(server: &McpServer, line: &str, tx: &mpsc::Sender<String>) {
    let Some(response) = lnc_mcp::dispatch_jsonrpc(server, line).await else {
        return;
    };
    match serde_json::to_string(&response) {
        Ok(out) => {
            if tx.send(out).await.is_err() {
                warn!("response writer closed; dropping response");
            }
        }
        Err(e) => error!(error = %e, "failed to serialize response"),
    }
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::Receiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix. A handler that cannot be
/// installed never resolves.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(signal = "SIGINT", "received signal"),
        _ = terminate => info!(signal = "SIGTERM", "received signal"),
    }
}
