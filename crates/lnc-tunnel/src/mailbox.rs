//! Seam to the mailbox relay library.
//!
//! The relay handshake protocol lives outside this workspace. A dialer
//! opens a relay session from a [`MailboxRequest`] and hands back a status
//! probe plus, when the session came up, a connector that promotes the
//! tunnel into a node connection.

use async_trait::async_trait;
use lnc_core::{LncError, LncResult, NodeConnection, SessionKeypair};
use std::sync::Arc;

use crate::handshake::HandshakeCallbacks;
use crate::phrase::{PairingPhrase, Password};
use crate::relay::RelaySettings;

/// Everything a dialer needs to open one relay session.
pub struct MailboxRequest {
    pub relay: RelaySettings,
    pub phrase: PairingPhrase,
    pub password: Password,
    pub local_key: Arc<SessionKeypair>,
    pub callbacks: HandshakeCallbacks,
}

/// Relay-reported session status, sampled for diagnostics.
pub type StatusProbe = Box<dyn Fn() -> String + Send + Sync>;

/// Promotes an established relay session into a node connection.
///
/// Consumed by the call; a session is promoted at most once.
#[async_trait]
pub trait Connector: Send {
    async fn connect(self: Box<Self>) -> LncResult<Box<dyn NodeConnection>>;
}

pub struct MailboxSession {
    pub status: StatusProbe,
    /// `None` when the relay session produced no way to reach the node.
    pub connector: Option<Box<dyn Connector>>,
}

#[async_trait]
pub trait MailboxDialer: Send + Sync {
    async fn open(&self, request: MailboxRequest) -> LncResult<MailboxSession>;
}

/// Dialer used when no relay transport is linked into the binary.
///
/// Every attempt fails as a connection failure after input validation, so
/// the tool surface stays fully usable and errors are explicit.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnlinkedMailbox;

#[async_trait]
impl MailboxDialer for UnlinkedMailbox {
    async fn open(&self, request: MailboxRequest) -> LncResult<MailboxSession> {
        tracing::warn!(
            mailbox = %request.relay.address,
            "no mailbox transport linked into this build"
        );
        Err(LncError::ConnectionFailed(format!(
            "no mailbox transport available to reach {}",
            request.relay.address
        )))
    }
}
