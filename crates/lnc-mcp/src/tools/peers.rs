//! Peers and the public channel graph.

use async_trait::async_trait;
use lnc_core::{ChannelEdge, Feature, LightningNode, LncResult, Peer, RequestContext};
use lnc_tunnel::ConnectionSlot;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{object_schema, rpc, unknown_tool};
use crate::registry::ToolService;
use crate::types::ToolDescriptor;
use crate::wire::{parse_args, NodeInfoArgs, WireDescribeGraphArgs, WireNodeInfoArgs, GRAPH_SAMPLE};

pub struct PeerService {
    slot: Arc<ConnectionSlot>,
}

fn features_json(features: &BTreeMap<u32, Feature>) -> Vec<Value> {
    features
        .iter()
        .map(|(bit, f)| {
            json!({
                "feature": bit,
                "name": f.name,
                "is_required": f.is_required,
                "is_known": f.is_known,
            })
        })
        .collect()
}

fn peer_json(peer: &Peer) -> Value {
    let errors: Vec<Value> = peer
        .errors
        .iter()
        .map(|e| json!({"error": e.error, "timestamp": e.timestamp}))
        .collect();
    json!({
        "pub_key": peer.pub_key,
        "address": peer.address,
        "bytes_sent": peer.bytes_sent,
        "bytes_recv": peer.bytes_recv,
        "sat_sent": peer.sat_sent,
        "sat_recv": peer.sat_recv,
        "inbound": peer.inbound,
        "ping_time": peer.ping_time,
        "sync_type": peer.sync_type,
        "features": features_json(&peer.features),
        "errors": errors,
        "last_error": peer.errors.last().map(|e| e.error.clone()),
        "flap_count": peer.flap_count,
        "last_flap_ns": peer.last_flap_ns,
    })
}

fn node_json(node: &LightningNode) -> Value {
    let addresses: Vec<&str> = node.addresses.iter().map(|a| a.addr.as_str()).collect();
    json!({
        "pub_key": node.pub_key,
        "alias": node.alias,
        "addresses": addresses,
        "color": node.color,
    })
}

fn edge_json(edge: &ChannelEdge) -> Value {
    json!({
        "channel_id": edge.channel_id.to_string(),
        "chan_point": edge.chan_point,
        "node1_pub": edge.node1_pub,
        "node2_pub": edge.node2_pub,
        "capacity": edge.capacity,
    })
}

impl PeerService {
    pub fn new(slot: Arc<ConnectionSlot>) -> Self {
        Self { slot }
    }

    async fn list_peers(&self, ctx: &RequestContext) -> LncResult<Value> {
        let client = self.slot.client()?;
        let peers = rpc(ctx, "list peers", client.list_peers()).await?;
        let list: Vec<Value> = peers.iter().map(peer_json).collect();
        Ok(json!({
            "total_peers": list.len(),
            "peers": list,
        }))
    }

    /// Whole-graph totals with a small sample; the full graph is far too
    /// large to hand to a client.
    async fn describe_graph(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let client = self.slot.client()?;
        let args: WireDescribeGraphArgs = parse_args("lnc_describe_graph", args)?;
        let graph = rpc(
            ctx,
            "describe graph",
            client.describe_graph(args.include_unannounced),
        )
        .await?;

        let sample_nodes: Vec<Value> = graph.nodes.iter().take(GRAPH_SAMPLE).map(node_json).collect();
        let sample_edges: Vec<Value> = graph.edges.iter().take(GRAPH_SAMPLE).map(edge_json).collect();
        Ok(json!({
            "total_nodes": graph.nodes.len(),
            "total_edges": graph.edges.len(),
            "include_unannounced": args.include_unannounced,
            "sample_nodes": sample_nodes,
            "sample_edges": sample_edges,
        }))
    }

    async fn get_node_info(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let client = self.slot.client()?;
        let wire: WireNodeInfoArgs = parse_args("lnc_get_node_info", args)?;
        let args = NodeInfoArgs::try_from(wire)?;
        let info = rpc(
            ctx,
            "get node info",
            client.get_node_info(&args.pub_key, args.include_channels),
        )
        .await?;

        let mut out = node_json(&info.node);
        out["num_channels"] = json!(info.num_channels);
        out["total_capacity"] = json!(info.total_capacity);
        out["features"] = json!(features_json(&info.node.features));
        if args.include_channels && !info.channels.is_empty() {
            let channels: Vec<Value> = info.channels.iter().map(edge_json).collect();
            out["channels"] = json!(channels);
        }
        Ok(out)
    }
}

#[async_trait]
impl ToolService for PeerService {
    fn name(&self) -> &'static str {
        "peers"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::read_only(
                "lnc_list_peers",
                "List all connected Lightning Network peers",
                object_schema(json!({}), &[]),
            ),
            ToolDescriptor::read_only(
                "lnc_describe_graph",
                "Get Lightning Network graph information including nodes and channels",
                object_schema(
                    json!({
                        "include_unannounced": {
                            "type": "boolean",
                            "description": "Include unannounced channels"
                        }
                    }),
                    &[],
                ),
            ),
            ToolDescriptor::read_only(
                "lnc_get_node_info",
                "Get detailed information about a specific Lightning Network node",
                object_schema(
                    json!({
                        "pub_key": {
                            "type": "string",
                            "description": "Public key of the node (hex encoded)",
                            "pattern": "^[0-9a-fA-F]{66}$"
                        },
                        "include_channels": {
                            "type": "boolean",
                            "description": "Include the node's channels"
                        }
                    }),
                    &["pub_key"],
                ),
            ),
        ]
    }

    async fn call(&self, tool: &str, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        match tool {
            "lnc_list_peers" => self.list_peers(ctx).await,
            "lnc_describe_graph" => self.describe_graph(ctx, args).await,
            "lnc_get_node_info" => self.get_node_info(ctx, args).await,
            other => Err(unknown_tool(self.name(), other)),
        }
    }
}
