//! Single active node connection.

use lnc_core::{LightningClient, LncError, LncResult, NodeConnection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::negotiator::ConnectionGuard;

/// Identity of the installed connection, reported to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub node_pubkey: String,
    pub alias: String,
    pub mailbox: String,
}

struct Installed {
    connection: Box<dyn NodeConnection>,
    client: Arc<dyn LightningClient>,
    summary: ConnectionSummary,
}

/// Holds at most one node connection.
///
/// Installing a connection closes whatever was installed before it, under
/// the same lock, so concurrent installs never leak a handle: the last
/// install wins and every predecessor is closed exactly once. Query
/// services read the client through [`ConnectionSlot::client`].
#[derive(Default)]
pub struct ConnectionSlot {
    current: Mutex<Option<Installed>>,
}

fn close_logged(installed: Installed, why: &str) {
    match installed.connection.close() {
        Ok(()) => info!(
            node_pubkey = %installed.summary.node_pubkey,
            reason = why,
            "closed node connection"
        ),
        Err(e) => warn!(
            node_pubkey = %installed.summary.node_pubkey,
            error = %e,
            "failed to close node connection"
        ),
    }
}

impl ConnectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> LncResult<MutexGuard<'_, Option<Installed>>> {
        self.current
            .lock()
            .map_err(|e| LncError::Unknown(format!("connection slot lock poisoned: {}", e)))
    }

    /// Install `connection`, closing any previous one first.
    /// Returns whether a previous connection was superseded.
    pub fn supersede(
        &self,
        connection: Box<dyn NodeConnection>,
        summary: ConnectionSummary,
    ) -> LncResult<bool> {
        let client = connection.lightning();
        let mut current = self.lock()?;
        let replaced = match current.take() {
            Some(previous) => {
                close_logged(previous, "superseded");
                true
            }
            None => false,
        };
        *current = Some(Installed {
            connection,
            client,
            summary,
        });
        Ok(replaced)
    }

    /// Install a guarded connection from negotiation.
    ///
    /// The guard is released and the handle installed without yielding, so
    /// a cancelled caller cannot strand it between the two.
    pub fn install(
        &self,
        connection: ConnectionGuard,
        summary: ConnectionSummary,
    ) -> LncResult<bool> {
        let connection = connection.release()?;
        self.supersede(connection, summary)
    }

    /// Close and remove the installed connection. Returns `false`, not an
    /// error, when nothing was installed.
    pub fn disconnect(&self) -> LncResult<bool> {
        let previous = self.lock()?.take();
        match previous {
            Some(installed) => {
                close_logged(installed, "disconnect");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn client(&self) -> LncResult<Arc<dyn LightningClient>> {
        self.lock()?
            .as_ref()
            .map(|i| Arc::clone(&i.client))
            .ok_or(LncError::NotConnected)
    }

    pub fn summary(&self) -> Option<ConnectionSummary> {
        self.lock()
            .ok()
            .and_then(|c| c.as_ref().map(|i| i.summary.clone()))
    }

    pub fn is_connected(&self) -> bool {
        self.lock().map(|c| c.is_some()).unwrap_or(false)
    }
}
