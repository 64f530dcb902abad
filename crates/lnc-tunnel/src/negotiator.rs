//! Pairing-phrase tunnel negotiation.
//!
//! Turns a pairing phrase and password into a live node connection via an
//! untrusted mailbox relay. The steps run strictly in order:
//!
//! ```text
//! validate -> session key -> open relay -> grace wait -> connector check
//!          -> await callbacks -> connect -> liveness (get_info)
//! ```
//!
//! The grace wait and callback wait honour request cancellation. Connecting
//! and the liveness RPC do not; each is bounded by `connect_timeout` only.
//! Nothing is retried here.

use lnc_core::{LncError, LncResult, NodeConnection, NodeInfo, RequestContext, SessionKeypair};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::handshake::{handshake_signals, HandshakeObservation};
use crate::mailbox::{MailboxDialer, MailboxRequest, MailboxSession};
use crate::phrase::{PairingPhrase, Password};
use crate::relay::{RelayAddress, RelaySettings, DEFAULT_MAILBOX};

#[derive(Debug, Clone)]
pub struct NegotiatorConfig {
    /// Relay used when a request names none.
    pub default_mailbox: String,
    pub default_dev_mode: bool,
    pub default_insecure: bool,
    /// Fixed wait after opening the relay session.
    pub grace_period: Duration,
    /// Upper bound on waiting for the handshake callbacks.
    pub callback_ceiling: Duration,
    /// Bound on the connector call and on the liveness RPC, each.
    pub connect_timeout: Duration,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            default_mailbox: DEFAULT_MAILBOX.to_string(),
            default_dev_mode: false,
            default_insecure: false,
            grace_period: Duration::from_secs(3),
            callback_ceiling: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Caller inputs for one negotiation attempt.
#[derive(Debug, Clone, Default)]
pub struct ConnectRequest {
    pub pairing_phrase: String,
    pub password: String,
    pub mailbox: Option<String>,
    pub dev_mode: Option<bool>,
    pub insecure: Option<bool>,
}

/// A successful negotiation. The connection has passed its liveness check
/// and is owned by the holder until installed in a [`crate::ConnectionSlot`].
pub struct Negotiated {
    pub connection: ConnectionGuard,
    pub node_info: NodeInfo,
    pub relay: RelaySettings,
    pub handshake: HandshakeObservation,
}

pub struct TunnelNegotiator {
    dialer: Arc<dyn MailboxDialer>,
    config: NegotiatorConfig,
}

fn failed(stage: &str, err: LncError) -> LncError {
    match err {
        LncError::Cancelled(_) => err,
        LncError::ConnectionFailed(msg) => LncError::ConnectionFailed(format!("{}: {}", stage, msg)),
        other => LncError::ConnectionFailed(format!("{}: {}", stage, other)),
    }
}

/// A freshly connected node handle, closed on drop unless released.
///
/// Holds the connection from `connect` until it is installed in a
/// [`crate::ConnectionSlot`], so a failed liveness check, a timeout or an
/// aborted task never leaves it open.
pub struct ConnectionGuard {
    connection: Option<Box<dyn NodeConnection>>,
}

impl ConnectionGuard {
    pub fn new(connection: Box<dyn NodeConnection>) -> Self {
        Self {
            connection: Some(connection),
        }
    }

    /// Take ownership of the handle; dropping the guard no longer closes it.
    pub fn release(mut self) -> LncResult<Box<dyn NodeConnection>> {
        self.connection
            .take()
            .ok_or_else(|| LncError::Unknown("node connection already released".into()))
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            match connection.close() {
                Ok(()) => info!("closed unclaimed node connection"),
                Err(e) => warn!(error = %e, "failed to close unclaimed node connection"),
            }
        }
    }
}

impl TunnelNegotiator {
    pub fn new(dialer: Arc<dyn MailboxDialer>, config: NegotiatorConfig) -> Self {
        Self { dialer, config }
    }

    pub fn config(&self) -> &NegotiatorConfig {
        &self.config
    }

    /// Resolve relay address and TLS policy for a request, falling back to
    /// configured defaults for anything the request leaves out.
    pub fn relay_settings(&self, request: &ConnectRequest) -> LncResult<RelaySettings> {
        let raw = request
            .mailbox
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.config.default_mailbox);
        let address = RelayAddress::parse(raw)?;
        Ok(RelaySettings::resolve(
            address,
            request.dev_mode.unwrap_or(self.config.default_dev_mode),
            request.insecure.unwrap_or(self.config.default_insecure),
        ))
    }

    pub async fn negotiate(
        &self,
        ctx: &RequestContext,
        request: ConnectRequest,
    ) -> LncResult<Negotiated> {
        let phrase = PairingPhrase::parse(&request.pairing_phrase)?;
        let password = Password::new(request.password.clone())?;
        let relay = self.relay_settings(&request)?;
        ctx.check()?;

        info!(mailbox = %relay.address, tls = %relay.tls, "negotiating LNC session");

        let local_key = Arc::new(SessionKeypair::generate());
        debug!(session_key = %local_key.fingerprint(), "generated session keypair");

        let (callbacks, waiter) = handshake_signals();
        let MailboxSession { status, connector } = self
            .dialer
            .open(MailboxRequest {
                relay: relay.clone(),
                phrase,
                password,
                local_key,
                callbacks,
            })
            .await
            .map_err(|e| failed("failed to create mailbox connection", e))?;

        ctx.run(tokio::time::sleep(self.config.grace_period))
            .await?;

        let connector = connector.ok_or_else(|| {
            LncError::ConnectionFailed(
                "node connector not available after mailbox setup".into(),
            )
        })?;

        let handshake = waiter.wait(self.config.callback_ceiling, ctx).await?;
        if handshake.incomplete {
            warn!(
                remote_key_received = handshake.remote_key_received(),
                auth_received = handshake.auth_received,
                relay_status = %status(),
                "handshake callbacks incomplete, proceeding"
            );
        } else {
            debug!(
                remote_key_received = handshake.remote_key_received(),
                auth_received = handshake.auth_received,
                relay_status = %status(),
                "handshake callbacks observed"
            );
        }

        let timeout = self.config.connect_timeout;
        let connection = match tokio::time::timeout(timeout, connector.connect()).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => return Err(failed("failed to establish node connection", e)),
            Err(_) => {
                return Err(LncError::ConnectionFailed(format!(
                    "failed to establish node connection: timed out after {}s",
                    timeout.as_secs()
                )))
            }
        };

        let client = connection.lightning();
        let connection = ConnectionGuard::new(connection);
        let node_info = match tokio::time::timeout(timeout, client.get_info()).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                return Err(LncError::ConnectionFailed(format!(
                    "connected but failed to get node info: {}",
                    e
                )));
            }
            Err(_) => {
                return Err(LncError::ConnectionFailed(format!(
                    "connected but failed to get node info: timed out after {}s",
                    timeout.as_secs()
                )));
            }
        };

        info!(
            node_pubkey = %node_info.identity_pubkey,
            alias = %node_info.alias,
            channels = node_info.num_active_channels,
            peers = node_info.num_peers,
            "connected to Lightning node"
        );

        Ok(Negotiated {
            connection,
            node_info,
            relay,
            handshake,
        })
    }
}
