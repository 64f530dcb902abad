//! Invoice decoding and lookup.

use async_trait::async_trait;
use lnc_core::{Invoice, InvoiceState, ListInvoicesRequest, LncResult, PayReq, RequestContext};
use lnc_tunnel::ConnectionSlot;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{object_schema, rpc, unknown_tool};
use crate::registry::ToolService;
use crate::types::ToolDescriptor;
use crate::wire::{
    parse_args, DecodeInvoiceArgs, PaymentHashArgs, WireDecodeInvoiceArgs, WireListInvoicesArgs,
    WirePaymentHashArgs,
};

pub struct InvoiceService {
    slot: Arc<ConnectionSlot>,
}

fn invoice_json(invoice: &Invoice) -> Value {
    json!({
        "memo": invoice.memo,
        "payment_request": invoice.payment_request,
        "r_hash": hex::encode(&invoice.r_hash),
        "value": invoice.value,
        "value_msat": invoice.value_msat,
        "settled": invoice.state == InvoiceState::Settled,
        "creation_date": invoice.creation_date,
        "settle_date": invoice.settle_date,
        "expiry": invoice.expiry,
        "cltv_expiry": invoice.cltv_expiry,
        "private": invoice.private,
        "add_index": invoice.add_index,
        "settle_index": invoice.settle_index,
        "amt_paid_sat": invoice.amt_paid_sat,
        "amt_paid_msat": invoice.amt_paid_msat,
        "state": invoice.state.to_string(),
        "is_keysend": invoice.is_keysend,
        "payment_addr": hex::encode(&invoice.payment_addr),
    })
}

fn pay_req_json(decoded: &PayReq) -> Value {
    let route_hints: Vec<Value> = decoded
        .route_hints
        .iter()
        .map(|hint| {
            let hops: Vec<Value> = hint
                .hop_hints
                .iter()
                .map(|hop| {
                    json!({
                        "node_id": hop.node_id,
                        "chan_id": hop.chan_id.to_string(),
                        "fee_base_msat": hop.fee_base_msat,
                        "fee_proportional_millionths": hop.fee_proportional_millionths,
                        "cltv_expiry_delta": hop.cltv_expiry_delta,
                    })
                })
                .collect();
            json!({"hop_hints": hops})
        })
        .collect();

    let features: Map<String, Value> = decoded
        .features
        .iter()
        .map(|(bit, f)| {
            (
                bit.to_string(),
                json!({"name": f.name, "is_required": f.is_required, "is_known": f.is_known}),
            )
        })
        .collect();

    json!({
        "destination": decoded.destination,
        "payment_hash": decoded.payment_hash,
        "amount_sats": decoded.num_satoshis,
        "amount_msat": decoded.num_msat,
        "timestamp": decoded.timestamp,
        "expiry": decoded.expiry,
        "description": decoded.description,
        "description_hash": decoded.description_hash,
        "fallback_address": decoded.fallback_addr,
        "cltv_expiry": decoded.cltv_expiry,
        "route_hints": route_hints,
        "payment_addr": hex::encode(&decoded.payment_addr),
        "features": features,
    })
}

impl InvoiceService {
    pub fn new(slot: Arc<ConnectionSlot>) -> Self {
        Self { slot }
    }

    async fn decode(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let client = self.slot.client()?;
        let wire: WireDecodeInvoiceArgs = parse_args("lnc_decode_invoice", args)?;
        let args = DecodeInvoiceArgs::try_from(wire)?;
        let decoded = rpc(ctx, "decode invoice", client.decode_pay_req(&args.invoice)).await?;
        Ok(pay_req_json(&decoded))
    }

    async fn list(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let client = self.slot.client()?;
        let wire: WireListInvoicesArgs = parse_args("lnc_list_invoices", args)?;
        let request = ListInvoicesRequest::try_from(wire)?;
        let list = rpc(ctx, "list invoices", client.list_invoices(request)).await?;
        let invoices: Vec<Value> = list.invoices.iter().map(invoice_json).collect();
        Ok(json!({
            "total_invoices": invoices.len(),
            "invoices": invoices,
            "first_index_offset": list.first_index_offset,
            "last_index_offset": list.last_index_offset,
        }))
    }

    async fn lookup(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let client = self.slot.client()?;
        let wire: WirePaymentHashArgs = parse_args("lnc_lookup_invoice", args)?;
        let hash = PaymentHashArgs::try_from(wire)?;
        let invoice = rpc(ctx, "lookup invoice", client.lookup_invoice(&hash.bytes)).await?;
        Ok(invoice_json(&invoice))
    }
}

#[async_trait]
impl ToolService for InvoiceService {
    fn name(&self) -> &'static str {
        "invoices"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::read_only(
                "lnc_decode_invoice",
                "Decode a BOLT11 Lightning invoice to inspect its contents",
                object_schema(
                    json!({
                        "invoice": {
                            "type": "string",
                            "description": "BOLT11 invoice string to decode",
                            "pattern": "^ln[a-z0-9]+$"
                        }
                    }),
                    &["invoice"],
                ),
            ),
            ToolDescriptor::read_only(
                "lnc_list_invoices",
                "List invoices created by this Lightning node",
                object_schema(
                    json!({
                        "pending_only": {
                            "type": "boolean",
                            "description": "Only return pending/unpaid invoices"
                        },
                        "index_offset": {
                            "type": "number",
                            "description": "Start index for pagination",
                            "minimum": 0
                        },
                        "num_max_invoices": {
                            "type": "number",
                            "description": "Maximum number of invoices to return",
                            "minimum": 1,
                            "maximum": 1000
                        },
                        "reversed": {
                            "type": "boolean",
                            "description": "Return invoices in reverse chronological order"
                        }
                    }),
                    &[],
                ),
            ),
            ToolDescriptor::read_only(
                "lnc_lookup_invoice",
                "Look up a specific invoice by its payment hash",
                object_schema(
                    json!({
                        "payment_hash": {
                            "type": "string",
                            "description": "Payment hash of the invoice (hex encoded)",
                            "pattern": "^[0-9a-fA-F]{64}$"
                        }
                    }),
                    &["payment_hash"],
                ),
            ),
        ]
    }

    async fn call(&self, tool: &str, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        match tool {
            "lnc_decode_invoice" => self.decode(ctx, args).await,
            "lnc_list_invoices" => self.list(ctx, args).await,
            "lnc_lookup_invoice" => self.lookup(ctx, args).await,
            other => Err(unknown_tool(self.name(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::connected;
    use lnc_core::{Feature, HopHint, LncError, NodeSnapshot, RouteHint};

    fn invoice(index: u64, state: InvoiceState) -> Invoice {
        Invoice {
            memo: format!("invoice {}", index),
            r_hash: vec![index as u8; 32],
            value: 1_000 * index as i64,
            add_index: index,
            state,
            ..Default::default()
        }
    }

    fn snapshot() -> NodeSnapshot {
        let mut snapshot = NodeSnapshot {
            invoices: vec![
                invoice(1, InvoiceState::Settled),
                invoice(2, InvoiceState::Open),
                invoice(3, InvoiceState::Canceled),
                invoice(4, InvoiceState::Open),
            ],
            ..Default::default()
        };
        let mut features = std::collections::BTreeMap::new();
        features.insert(
            9,
            Feature {
                name: "tlv-onion".into(),
                is_required: false,
                is_known: true,
            },
        );
        snapshot.decoded.insert(
            "lnbcrt10u1pexample".into(),
            PayReq {
                destination: "02dest".into(),
                payment_hash: "ab".repeat(32),
                num_satoshis: 1_000,
                num_msat: 1_000_000,
                description: "coffee".into(),
                route_hints: vec![RouteHint {
                    hop_hints: vec![HopHint {
                        node_id: "03hop".into(),
                        chan_id: 123_456_789,
                        fee_base_msat: 1_000,
                        fee_proportional_millionths: 1,
                        cltv_expiry_delta: 40,
                    }],
                }],
                payment_addr: vec![0xcd; 32],
                features,
                ..Default::default()
            },
        );
        snapshot
    }

    #[tokio::test]
    async fn test_decode_invoice() {
        let (_, slot) = connected(snapshot());
        let svc = InvoiceService::new(slot);
        let ctx = RequestContext::new("lnc_decode_invoice");
        let out = svc
            .call("lnc_decode_invoice", &ctx, json!({"invoice": "lnbcrt10u1pexample"}))
            .await
            .unwrap();
        assert_eq!(out["destination"], "02dest");
        assert_eq!(out["amount_sats"], 1_000);
        assert_eq!(out["description"], "coffee");
        assert_eq!(out["route_hints"][0]["hop_hints"][0]["chan_id"], "123456789");
        assert_eq!(out["features"]["9"]["name"], "tlv-onion");
        assert_eq!(out["payment_addr"], "cd".repeat(32));
    }

    #[tokio::test]
    async fn test_decode_rejects_non_bolt11_without_rpc() {
        let (node, slot) = connected(snapshot());
        let svc = InvoiceService::new(slot);
        let ctx = RequestContext::new("lnc_decode_invoice");
        let err = svc
            .call("lnc_decode_invoice", &ctx, json!({"invoice": "bc1qnotaninvoice"}))
            .await
            .unwrap_err();
        assert!(matches!(err, LncError::InvalidInvoice(_)));
        assert_eq!(node.call_count(), 0);
    }

    #[tokio::test]
    async fn test_decode_failure_from_node() {
        let (_, slot) = connected(snapshot());
        let svc = InvoiceService::new(slot);
        let ctx = RequestContext::new("lnc_decode_invoice");
        let err = svc
            .call("lnc_decode_invoice", &ctx, json!({"invoice": "lnbc1unknown"}))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to decode invoice: invalid payment request"
        );
    }

    #[tokio::test]
    async fn test_list_pending_only() {
        let (_, slot) = connected(snapshot());
        let svc = InvoiceService::new(slot);
        let ctx = RequestContext::new("lnc_list_invoices");
        let out = svc
            .call("lnc_list_invoices", &ctx, json!({"pending_only": true}))
            .await
            .unwrap();
        assert_eq!(out["total_invoices"], 2);
        assert_eq!(out["invoices"][0]["state"], "OPEN");
        assert_eq!(out["invoices"][0]["settled"], false);
        assert_eq!(out["first_index_offset"], 2);
        assert_eq!(out["last_index_offset"], 4);
    }

    #[tokio::test]
    async fn test_list_paging_forwarded() {
        let (_, slot) = connected(snapshot());
        let svc = InvoiceService::new(slot);
        let ctx = RequestContext::new("lnc_list_invoices");
        let out = svc
            .call(
                "lnc_list_invoices",
                &ctx,
                json!({"index_offset": 1, "num_max_invoices": 2}),
            )
            .await
            .unwrap();
        assert_eq!(out["total_invoices"], 2);
        assert_eq!(out["invoices"][0]["add_index"], 2);
        assert_eq!(out["invoices"][1]["add_index"], 3);
    }

    #[tokio::test]
    async fn test_list_rejects_oversized_page() {
        let (node, slot) = connected(snapshot());
        let svc = InvoiceService::new(slot);
        let ctx = RequestContext::new("lnc_list_invoices");
        let err = svc
            .call("lnc_list_invoices", &ctx, json!({"num_max_invoices": 5000}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "num_max_invoices must be between 1 and 1000");
        assert_eq!(node.call_count(), 0);
    }

    #[tokio::test]
    async fn test_lookup_by_hash() {
        let (_, slot) = connected(snapshot());
        let svc = InvoiceService::new(slot);
        let ctx = RequestContext::new("lnc_lookup_invoice");
        let out = svc
            .call("lnc_lookup_invoice", &ctx, json!({"payment_hash": "01".repeat(32)}))
            .await
            .unwrap();
        assert_eq!(out["memo"], "invoice 1");
        assert_eq!(out["settled"], true);
        assert_eq!(out["r_hash"], "01".repeat(32));
    }

    #[tokio::test]
    async fn test_lookup_requires_connection_first() {
        let svc = InvoiceService::new(Arc::new(ConnectionSlot::new()));
        let ctx = RequestContext::new("lnc_lookup_invoice");
        let err = svc
            .call("lnc_lookup_invoice", &ctx, json!({"payment_hash": "nope"}))
            .await
            .unwrap_err();
        assert!(matches!(err, LncError::NotConnected));
    }
}
