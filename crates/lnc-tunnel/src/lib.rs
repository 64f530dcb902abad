//! Tunnel negotiation for Lightning Node Connect.
//!
//! Drives the pairing-phrase handshake against a mailbox relay and keeps
//! the single resulting node connection.
//!
//! # Flow
//!
//! ```text
//! ConnectRequest -> TunnelNegotiator::negotiate -> Negotiated -> ConnectionSlot::install
//! ```
//!
//! The relay protocol itself sits behind [`MailboxDialer`]. The binary
//! links [`UnlinkedMailbox`]; tests use [`ScriptedMailbox`].

pub mod handshake;
pub mod mailbox;
pub mod negotiator;
pub mod phrase;
pub mod relay;
pub mod scripted;
pub mod slot;

pub use handshake::{handshake_signals, HandshakeCallbacks, HandshakeObservation, HandshakeWaiter};
pub use mailbox::{Connector, MailboxDialer, MailboxRequest, MailboxSession, StatusProbe, UnlinkedMailbox};
pub use negotiator::{ConnectRequest, ConnectionGuard, Negotiated, NegotiatorConfig, TunnelNegotiator};
pub use phrase::{PairingPhrase, Password, PAIRING_PHRASE_WORDS};
pub use relay::{RelayAddress, RelaySettings, RelayTls, SkipReason, DEFAULT_MAILBOX};
pub use scripted::{OpenedSession, ScriptedMailbox};
pub use slot::{ConnectionSlot, ConnectionSummary};
