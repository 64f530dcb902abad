//! Node identity and balances.

use async_trait::async_trait;
use lnc_core::{Amount, LncResult, RequestContext};
use lnc_tunnel::ConnectionSlot;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{object_schema, rpc, unknown_tool};
use crate::registry::ToolService;
use crate::types::ToolDescriptor;

pub struct NodeService {
    slot: Arc<ConnectionSlot>,
}

fn amount(a: &Amount) -> Value {
    json!({"sat": a.sat, "msat": a.msat})
}

impl NodeService {
    pub fn new(slot: Arc<ConnectionSlot>) -> Self {
        Self { slot }
    }

    async fn get_info(&self, ctx: &RequestContext) -> LncResult<Value> {
        let client = self.slot.client()?;
        let info = rpc(ctx, "get node info", client.get_info()).await?;
        let chains: Vec<&str> = info.chains.iter().map(|c| c.network.as_str()).collect();
        Ok(json!({
            "node_id": info.identity_pubkey,
            "alias": info.alias,
            "color": info.color,
            "version": info.version,
            "num_peers": info.num_peers,
            "num_active_channels": info.num_active_channels,
            "num_inactive_channels": info.num_inactive_channels,
            "num_pending_channels": info.num_pending_channels,
            "synced_to_chain": info.synced_to_chain,
            "synced_to_graph": info.synced_to_graph,
            "block_height": info.block_height,
            "block_hash": info.block_hash,
            "primary_network": info.primary_network(),
            "chains": chains,
        }))
    }

    async fn get_balance(&self, ctx: &RequestContext) -> LncResult<Value> {
        let client = self.slot.client()?;
        let wallet = rpc(ctx, "get wallet balance", client.wallet_balance()).await?;
        let channel = rpc(ctx, "get channel balance", client.channel_balance()).await?;

        let total_channel = channel.local_balance.sat + channel.remote_balance.sat;
        let total_pending =
            channel.pending_open_local_balance.sat + channel.pending_open_remote_balance.sat;

        Ok(json!({
            "wallet_balance": {
                "total_balance": wallet.total_balance,
                "confirmed_balance": wallet.confirmed_balance,
                "unconfirmed_balance": wallet.unconfirmed_balance,
                "locked_balance": wallet.locked_balance,
            },
            "channel_balance": {
                "total_balance": total_channel,
                "pending_open_balance": total_pending,
                "local_balance": amount(&channel.local_balance),
                "remote_balance": amount(&channel.remote_balance),
                "unsettled_local_balance": amount(&channel.unsettled_local_balance),
                "unsettled_remote_balance": amount(&channel.unsettled_remote_balance),
                "pending_open_local_balance": amount(&channel.pending_open_local_balance),
                "pending_open_remote_balance": amount(&channel.pending_open_remote_balance),
            }
        }))
    }
}

#[async_trait]
impl ToolService for NodeService {
    fn name(&self) -> &'static str {
        "node"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::read_only(
                "lnc_get_info",
                "Get Lightning node information including version, peers, and channels",
                object_schema(json!({}), &[]),
            ),
            ToolDescriptor::read_only(
                "lnc_get_balance",
                "Get on-chain wallet balance and channel balance information",
                object_schema(json!({}), &[]),
            ),
        ]
    }

    async fn call(&self, tool: &str, ctx: &RequestContext, _args: Value) -> LncResult<Value> {
        match tool {
            "lnc_get_info" => self.get_info(ctx).await,
            "lnc_get_balance" => self.get_balance(ctx).await,
            other => Err(unknown_tool(self.name(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::connected;
    use lnc_core::{Chain, ChannelBalance, LncError, NodeInfo, NodeSnapshot, WalletBalance};

    fn snapshot() -> NodeSnapshot {
        NodeSnapshot {
            info: NodeInfo {
                identity_pubkey: "02abc".into(),
                alias: "alice".into(),
                num_peers: 3,
                block_height: 820_000,
                chains: vec![Chain {
                    chain: "bitcoin".into(),
                    network: "testnet".into(),
                }],
                ..Default::default()
            },
            wallet: WalletBalance {
                total_balance: 150_000,
                confirmed_balance: 100_000,
                unconfirmed_balance: 50_000,
                locked_balance: 0,
            },
            channel_balance: ChannelBalance {
                local_balance: Amount::from_sat(70_000),
                remote_balance: Amount::from_sat(30_000),
                pending_open_local_balance: Amount::from_sat(5_000),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_not_connected_issues_no_rpc() {
        let svc = NodeService::new(Arc::new(ConnectionSlot::new()));
        let ctx = RequestContext::new("lnc_get_info");
        let err = svc.call("lnc_get_info", &ctx, Value::Null).await.unwrap_err();
        assert!(matches!(err, LncError::NotConnected));
    }

    #[tokio::test]
    async fn test_get_info() {
        let (_, slot) = connected(snapshot());
        let svc = NodeService::new(slot);
        let ctx = RequestContext::new("lnc_get_info");
        let out = svc.call("lnc_get_info", &ctx, Value::Null).await.unwrap();
        assert_eq!(out["node_id"], "02abc");
        assert_eq!(out["alias"], "alice");
        assert_eq!(out["block_height"], 820_000);
        assert_eq!(out["primary_network"], "testnet");
        assert_eq!(out["chains"], json!(["testnet"]));
    }

    #[tokio::test]
    async fn test_get_balance_totals() {
        let (node, slot) = connected(snapshot());
        let svc = NodeService::new(slot);
        let ctx = RequestContext::new("lnc_get_balance");
        let out = svc.call("lnc_get_balance", &ctx, Value::Null).await.unwrap();
        assert_eq!(out["wallet_balance"]["confirmed_balance"], 100_000);
        assert_eq!(out["channel_balance"]["total_balance"], 100_000);
        assert_eq!(out["channel_balance"]["pending_open_balance"], 5_000);
        assert_eq!(out["channel_balance"]["local_balance"]["msat"], 70_000_000);
        assert_eq!(node.calls(), vec!["wallet_balance", "channel_balance"]);
    }

    #[tokio::test]
    async fn test_channel_balance_failure_is_reported() {
        let (node, slot) = connected(snapshot());
        node.fail("channel_balance");
        let svc = NodeService::new(slot);
        let ctx = RequestContext::new("lnc_get_balance");
        let err = svc
            .call("lnc_get_balance", &ctx, Value::Null)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to get channel balance: rpc error: code = Unavailable"
        );
    }
}
