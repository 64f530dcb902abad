//! `lnc_connect` and `lnc_disconnect`.

use async_trait::async_trait;
use lnc_core::{LncResult, RequestContext};
use lnc_tunnel::{ConnectRequest, ConnectionSlot, ConnectionSummary, Negotiated, TunnelNegotiator};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{object_schema, unknown_tool};
use crate::registry::ToolService;
use crate::types::ToolDescriptor;
use crate::wire::{parse_args, WireConnectArgs};

pub struct ConnectionService {
    slot: Arc<ConnectionSlot>,
    negotiator: Arc<TunnelNegotiator>,
    connect_timeout: Duration,
}

impl ConnectionService {
    /// `connect_timeout` is the request deadline for `lnc_connect`, which
    /// outlives the server-wide tool deadline.
    pub fn new(
        slot: Arc<ConnectionSlot>,
        negotiator: Arc<TunnelNegotiator>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            slot,
            negotiator,
            connect_timeout,
        }
    }

    async fn connect(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let wire: WireConnectArgs = parse_args("lnc_connect", args)?;
        let request = ConnectRequest::try_from(wire)?;

        let Negotiated {
            connection,
            node_info,
            relay,
            handshake,
        } = self.negotiator.negotiate(ctx, request).await?;

        let mailbox = relay.address.to_string();
        let replaced = self.slot.install(
            connection,
            ConnectionSummary {
                node_pubkey: node_info.identity_pubkey.clone(),
                alias: node_info.alias.clone(),
                mailbox: mailbox.clone(),
            },
        )?;

        info!(
            node_pubkey = %node_info.identity_pubkey,
            replaced_previous = replaced,
            handshake_incomplete = handshake.incomplete,
            elapsed_ms = ctx.elapsed().as_millis() as u64,
            "node connection installed"
        );

        Ok(json!({
            "connected": true,
            "node_pubkey": node_info.identity_pubkey,
            "alias": node_info.alias,
            "num_channels": node_info.num_active_channels,
            "num_peers": node_info.num_peers,
            "version": node_info.version,
            "mailbox_server": mailbox,
            "relay_tls": relay.tls.to_string(),
        }))
    }

    fn disconnect(&self) -> LncResult<Value> {
        let summary = self.slot.summary();
        let was_connected = self.slot.disconnect()?;
        let message = if was_connected {
            "Disconnected from Lightning node"
        } else {
            "No active connection"
        };
        let mut status = json!({
            "disconnected": true,
            "was_connected": was_connected,
            "message": message,
        });
        if let Some(summary) = summary.filter(|_| was_connected) {
            status["node_pubkey"] = json!(summary.node_pubkey);
            status["alias"] = json!(summary.alias);
            status["mailbox_server"] = json!(summary.mailbox);
        }
        Ok(status)
    }
}

#[async_trait]
impl ToolService for ConnectionService {
    fn name(&self) -> &'static str {
        "connection"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::read_only(
                "lnc_connect",
                "Connect to a Lightning node using LNC pairing phrase",
                object_schema(
                    json!({
                        "pairingPhrase": {
                            "type": "string",
                            "description": "The LNC pairing phrase (10 words)"
                        },
                        "password": {
                            "type": "string",
                            "description": "The LNC password"
                        },
                        "mailbox": {
                            "type": "string",
                            "description": "Custom mailbox server address (optional, e.g., 'localhost:11110' for regtest)"
                        },
                        "devMode": {
                            "type": "boolean",
                            "description": "Enable dev mode for local/regtest environments (optional)"
                        },
                        "insecure": {
                            "type": "boolean",
                            "description": "Skip TLS verification for dev environments (optional)"
                        }
                    }),
                    &["pairingPhrase", "password"],
                ),
            )
            .with_timeout(self.connect_timeout),
            ToolDescriptor::read_only(
                "lnc_disconnect",
                "Disconnect from the current Lightning node",
                object_schema(json!({}), &[]),
            ),
        ]
    }

    async fn call(&self, tool: &str, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        match tool {
            "lnc_connect" => self.connect(ctx, args).await,
            "lnc_disconnect" => self.disconnect(),
            other => Err(unknown_tool(self.name(), other)),
        }
    }
}
