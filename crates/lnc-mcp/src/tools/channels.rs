//! Open and pending channels.

use async_trait::async_trait;
use lnc_core::{
    Channel, ChannelConstraints, ListChannelsRequest, LncResult, PendingChannel, PendingChannels,
    RequestContext,
};
use lnc_tunnel::ConnectionSlot;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{object_schema, rpc, unknown_tool};
use crate::registry::ToolService;
use crate::types::ToolDescriptor;
use crate::wire::{parse_args, WireListChannelsArgs};

pub struct ChannelService {
    slot: Arc<ConnectionSlot>,
}

fn constraints_json(c: &ChannelConstraints) -> Value {
    json!({
        "csv_delay": c.csv_delay,
        "chan_reserve_sat": c.chan_reserve_sat,
        "dust_limit_sat": c.dust_limit_sat,
        "max_pending_amt_msat": c.max_pending_amt_msat,
        "min_htlc_msat": c.min_htlc_msat,
        "max_accepted_htlcs": c.max_accepted_htlcs,
    })
}

fn channel_json(ch: &Channel) -> Value {
    let mut entry = json!({
        "active": ch.active,
        "remote_pubkey": ch.remote_pubkey,
        "channel_point": ch.channel_point,
        // 64-bit ids lose precision as JSON numbers in most clients.
        "chan_id": ch.chan_id.to_string(),
        "capacity": ch.capacity,
        "local_balance": ch.local_balance,
        "remote_balance": ch.remote_balance,
        "commit_fee": ch.commit_fee,
        "commit_weight": ch.commit_weight,
        "fee_per_kw": ch.fee_per_kw,
        "unsettled_balance": ch.unsettled_balance,
        "total_satoshis_sent": ch.total_satoshis_sent,
        "total_satoshis_received": ch.total_satoshis_received,
        "num_updates": ch.num_updates,
        "pending_htlcs": ch.pending_htlcs,
        "private": ch.private,
        "initiator": ch.initiator,
        "chan_status_flags": ch.chan_status_flags,
    });
    if let Some(local) = &ch.local_constraints {
        entry["local_constraints"] = constraints_json(local);
    }
    if let Some(remote) = &ch.remote_constraints {
        entry["remote_constraints"] = constraints_json(remote);
    }
    entry
}

fn pending_channel_json(ch: &PendingChannel) -> Value {
    json!({
        "remote_node_pub": ch.remote_node_pub,
        "channel_point": ch.channel_point,
        "capacity": ch.capacity,
        "local_balance": ch.local_balance,
        "remote_balance": ch.remote_balance,
    })
}

fn pending_json(pending: &PendingChannels) -> Value {
    let opening: Vec<Value> = pending
        .pending_open_channels
        .iter()
        .map(|ch| {
            json!({
                "channel": pending_channel_json(&ch.channel),
                "commit_fee": ch.commit_fee,
                "commit_weight": ch.commit_weight,
                "fee_per_kw": ch.fee_per_kw,
            })
        })
        .collect();
    let force_closing: Vec<Value> = pending
        .pending_force_closing_channels
        .iter()
        .map(|ch| {
            json!({
                "channel": pending_channel_json(&ch.channel),
                "closing_txid": ch.closing_txid,
                "limbo_balance": ch.limbo_balance,
                "maturity_height": ch.maturity_height,
                "blocks_til_maturity": ch.blocks_til_maturity,
                "recovered_balance": ch.recovered_balance,
            })
        })
        .collect();
    let waiting_close: Vec<Value> = pending
        .waiting_close_channels
        .iter()
        .map(|ch| {
            json!({
                "channel": pending_channel_json(&ch.channel),
                "limbo_balance": ch.limbo_balance,
            })
        })
        .collect();

    json!({
        "pending_open_channels": opening,
        "pending_force_closing_channels": force_closing,
        "waiting_close_channels": waiting_close,
        "total_limbo_balance": pending.total_limbo_balance,
    })
}

impl ChannelService {
    pub fn new(slot: Arc<ConnectionSlot>) -> Self {
        Self { slot }
    }

    async fn list(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let client = self.slot.client()?;
        let wire: WireListChannelsArgs = parse_args("lnc_list_channels", args)?;
        let request = ListChannelsRequest::try_from(wire)?;
        let channels = rpc(ctx, "list channels", client.list_channels(request)).await?;
        let list: Vec<Value> = channels.iter().map(channel_json).collect();
        Ok(json!({
            "total_channels": list.len(),
            "channels": list,
        }))
    }

    async fn pending(&self, ctx: &RequestContext) -> LncResult<Value> {
        let client = self.slot.client()?;
        let pending = rpc(ctx, "get pending channels", client.pending_channels()).await?;
        Ok(pending_json(&pending))
    }
}

#[async_trait]
impl ToolService for ChannelService {
    fn name(&self) -> &'static str {
        "channels"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::read_only(
                "lnc_list_channels",
                "List all Lightning channels with detailed information",
                object_schema(
                    json!({
                        "active_only": {"type": "boolean", "description": "Only return active channels"},
                        "inactive_only": {"type": "boolean", "description": "Only return inactive channels"},
                        "public_only": {"type": "boolean", "description": "Only return public channels"},
                        "private_only": {"type": "boolean", "description": "Only return private channels"}
                    }),
                    &[],
                ),
            ),
            ToolDescriptor::read_only(
                "lnc_pending_channels",
                "List all pending Lightning channels",
                object_schema(json!({}), &[]),
            ),
        ]
    }

    async fn call(&self, tool: &str, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        match tool {
            "lnc_list_channels" => self.list(ctx, args).await,
            "lnc_pending_channels" => self.pending(ctx).await,
            other => Err(unknown_tool(self.name(), other)),
        }
    }
}
