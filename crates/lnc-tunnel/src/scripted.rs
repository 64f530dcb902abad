//! Scripted mailbox dialer backed by an in-memory node.
//!
//! Useful for testing negotiation and the tool surface without a relay.
//! Callback timing, connector presence and failures are all configurable,
//! and every opened session is recorded for inspection.

use async_trait::async_trait;
use lnc_core::{InMemoryConnection, InMemoryLightning, LncError, LncResult, NodeConnection};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::mailbox::{Connector, MailboxDialer, MailboxRequest, MailboxSession};
use crate::relay::RelaySettings;

/// A session as the dialer saw it.
#[derive(Debug, Clone)]
pub struct OpenedSession {
    pub relay: RelaySettings,
    pub normalized_phrase: String,
    pub local_key_hex: String,
}

#[derive(Debug, Clone)]
struct Plan {
    open_error: Option<String>,
    provide_connector: bool,
    remote_key: Option<(Duration, Vec<u8>)>,
    auth_data: Option<(Duration, Vec<u8>)>,
    connect_error: Option<String>,
    connect_delay: Duration,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            open_error: None,
            provide_connector: true,
            remote_key: Some((Duration::from_millis(200), vec![0x02; 33])),
            auth_data: Some((Duration::from_millis(400), b"macaroon".to_vec())),
            connect_error: None,
            connect_delay: Duration::ZERO,
        }
    }
}

pub struct ScriptedMailbox {
    node: Arc<InMemoryLightning>,
    plan: Plan,
    opened: Mutex<Vec<OpenedSession>>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedMailbox {
    /// Dialer whose sessions fire both callbacks promptly and connect to
    /// `node`.
    pub fn new(node: Arc<InMemoryLightning>) -> Self {
        Self {
            node,
            plan: Plan::default(),
            opened: Mutex::new(Vec::new()),
            connects: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_open(mut self, message: impl Into<String>) -> Self {
        self.plan.open_error = Some(message.into());
        self
    }

    pub fn without_connector(mut self) -> Self {
        self.plan.provide_connector = false;
        self
    }

    /// Never fire either handshake callback.
    pub fn silent_callbacks(mut self) -> Self {
        self.plan.remote_key = None;
        self.plan.auth_data = None;
        self
    }

    pub fn remote_key_after(mut self, delay: Duration, key: Vec<u8>) -> Self {
        self.plan.remote_key = Some((delay, key));
        self
    }

    pub fn auth_after(mut self, delay: Duration) -> Self {
        self.plan.auth_data = Some((delay, b"macaroon".to_vec()));
        self
    }

    pub fn failing_connect(mut self, message: impl Into<String>) -> Self {
        self.plan.connect_error = Some(message.into());
        self
    }

    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.plan.connect_delay = delay;
        self
    }

    pub fn opened(&self) -> Vec<OpenedSession> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().map(|o| o.len()).unwrap_or(0)
    }

    /// Times a connector was invoked.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Closes across every connection this dialer produced.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct ScriptedConnector {
    node: Arc<InMemoryLightning>,
    delay: Duration,
    error: Option<String>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(self: Box<Self>) -> LncResult<Box<dyn NodeConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(message) = &self.error {
            return Err(LncError::ConnectionFailed(message.clone()));
        }
        Ok(Box::new(InMemoryConnection::with_counter(
            Arc::clone(&self.node),
            Arc::clone(&self.closes),
        )))
    }
}

#[async_trait]
impl MailboxDialer for ScriptedMailbox {
    async fn open(&self, request: MailboxRequest) -> LncResult<MailboxSession> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(OpenedSession {
                relay: request.relay.clone(),
                normalized_phrase: request.phrase.normalized().to_string(),
                local_key_hex: request.local_key.public_key_hex(),
            });
        }

        if let Some(message) = &self.plan.open_error {
            return Err(LncError::ConnectionFailed(message.clone()));
        }

        if let Some((delay, key)) = self.plan.remote_key.clone() {
            let callbacks = request.callbacks.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                callbacks.on_remote_key(key);
            });
        }
        if let Some((delay, data)) = self.plan.auth_data.clone() {
            let callbacks = request.callbacks.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                callbacks.on_auth_data(data);
            });
        }

        let connector: Option<Box<dyn Connector>> = if self.plan.provide_connector {
            Some(Box::new(ScriptedConnector {
                node: Arc::clone(&self.node),
                delay: self.plan.connect_delay,
                error: self.plan.connect_error.clone(),
                connects: Arc::clone(&self.connects),
                closes: Arc::clone(&self.closes),
            }))
        } else {
            None
        };

        // The relay keeps its callbacks for the session's lifetime.
        let callbacks = request.callbacks;
        let relay = request.relay.address.to_string();
        Ok(MailboxSession {
            status: Box::new(move || {
                let _alive = &callbacks;
                format!("session open via {}", relay)
            }),
            connector,
        })
    }
}
