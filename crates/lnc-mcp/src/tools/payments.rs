//! Outgoing payment history.

use async_trait::async_trait;
use lnc_core::{ListPaymentsRequest, LncResult, Payment, RequestContext};
use lnc_tunnel::ConnectionSlot;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{object_schema, rpc, unknown_tool};
use crate::registry::ToolService;
use crate::types::ToolDescriptor;
use crate::wire::{parse_args, PaymentHashArgs, WireListPaymentsArgs, WirePaymentHashArgs};

pub struct PaymentService {
    slot: Arc<ConnectionSlot>,
}

fn payment_json(p: &Payment) -> Value {
    json!({
        "payment_hash": p.payment_hash,
        "value_sat": p.value_sat,
        "value_msat": p.value_msat,
        "payment_preimage": p.payment_preimage,
        "payment_request": p.payment_request,
        "status": p.status.to_string(),
        "fee_sat": p.fee_sat,
        "fee_msat": p.fee_msat,
        "creation_time_ns": p.creation_time_ns,
        "payment_index": p.payment_index,
        "failure_reason": p.failure_reason.to_string(),
        "htlc_count": p.htlc_count,
    })
}

impl PaymentService {
    pub fn new(slot: Arc<ConnectionSlot>) -> Self {
        Self { slot }
    }

    async fn list(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let client = self.slot.client()?;
        let wire: WireListPaymentsArgs = parse_args("lnc_list_payments", args)?;
        let request = ListPaymentsRequest::try_from(wire)?;
        let list = rpc(ctx, "list payments", client.list_payments(request)).await?;
        let payments: Vec<Value> = list.payments.iter().map(payment_json).collect();
        Ok(json!({
            "total_payments": payments.len(),
            "payments": payments,
            "first_index_offset": list.first_index_offset,
            "last_index_offset": list.last_index_offset,
        }))
    }

    /// Scans the payment history, including incomplete payments, for a
    /// matching hash. A miss is a normal result, not an error.
    async fn track(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let client = self.slot.client()?;
        let wire: WirePaymentHashArgs = parse_args("lnc_track_payment", args)?;
        let hash = PaymentHashArgs::try_from(wire)?;
        let request = ListPaymentsRequest {
            include_incomplete: true,
            ..Default::default()
        };
        let list = rpc(ctx, "fetch payment", client.list_payments(request)).await?;

        let found = list
            .payments
            .iter()
            .find(|p| p.payment_hash.eq_ignore_ascii_case(&hash.hex));
        Ok(match found {
            Some(p) => json!({
                "found": true,
                "payment_hash": p.payment_hash,
                "status": p.status.to_string(),
                "value_sat": p.value_sat,
                "fee_sat": p.fee_sat,
                "creation_time_ns": p.creation_time_ns,
                "payment_preimage": p.payment_preimage,
                "failure_reason": p.failure_reason.to_string(),
            }),
            None => json!({"found": false, "message": "Payment not found"}),
        })
    }
}

#[async_trait]
impl ToolService for PaymentService {
    fn name(&self) -> &'static str {
        "payments"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::read_only(
                "lnc_list_payments",
                "List historical Lightning payments made by this node",
                object_schema(
                    json!({
                        "include_incomplete": {
                            "type": "boolean",
                            "description": "Include incomplete/failed payments"
                        },
                        "index_offset": {
                            "type": "number",
                            "description": "Start index for pagination",
                            "minimum": 0
                        },
                        "max_payments": {
                            "type": "number",
                            "description": "Maximum number of payments to return",
                            "minimum": 1,
                            "maximum": 1000
                        },
                        "reversed": {
                            "type": "boolean",
                            "description": "Return payments in reverse chronological order"
                        }
                    }),
                    &[],
                ),
            ),
            ToolDescriptor::read_only(
                "lnc_track_payment",
                "Track the status of a Lightning payment by its hash",
                object_schema(
                    json!({
                        "payment_hash": {
                            "type": "string",
                            "description": "Payment hash to track (hex encoded)",
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
            "lnc_list_payments" => self.list(ctx, args).await,
            "lnc_track_payment" => self.track(ctx, args).await,
            other => Err(unknown_tool(self.name(), other)),
        }
    }
}
