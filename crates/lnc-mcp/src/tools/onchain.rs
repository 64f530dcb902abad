//! On-chain wallet: UTXOs, transactions and fee estimates.

use async_trait::async_trait;
use lnc_core::{
    GetTransactionsRequest, ListUnspentRequest, LncResult, RequestContext, Transaction, Utxo,
};
use lnc_tunnel::ConnectionSlot;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{object_schema, rpc, unknown_tool};
use crate::registry::ToolService;
use crate::types::ToolDescriptor;
use crate::wire::{
    parse_args, EstimateFeeArgs, WireEstimateFeeArgs, WireGetTransactionsArgs,
    WireListUnspentArgs,
};

pub struct OnChainService {
    slot: Arc<ConnectionSlot>,
}

fn utxo_json(utxo: &Utxo) -> Value {
    json!({
        "address_type": utxo.address_type,
        "address": utxo.address,
        "amount_sat": utxo.amount_sat,
        "pk_script": utxo.pk_script,
        "outpoint": utxo.outpoint.to_string(),
        "confirmations": utxo.confirmations,
    })
}

fn transaction_json(tx: &Transaction) -> Value {
    let previous: Vec<Value> = tx
        .previous_outpoints
        .iter()
        .map(|p| json!({"outpoint": p.outpoint, "is_our_output": p.is_our_output}))
        .collect();
    json!({
        "tx_hash": tx.tx_hash,
        "amount": tx.amount,
        "num_confirmations": tx.num_confirmations,
        "block_hash": tx.block_hash,
        "block_height": tx.block_height,
        "time_stamp": tx.time_stamp,
        "total_fees": tx.total_fees,
        "raw_tx_hex": tx.raw_tx_hex,
        "label": tx.label,
        "previous_outpoints": previous,
    })
}

impl OnChainService {
    pub fn new(slot: Arc<ConnectionSlot>) -> Self {
        Self { slot }
    }

    async fn list_unspent(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let client = self.slot.client()?;
        let wire: WireListUnspentArgs = parse_args("lnc_list_unspent", args)?;
        let request = ListUnspentRequest::try_from(wire)?;
        let utxos = rpc(ctx, "list unspent", client.list_unspent(request)).await?;
        let total: i64 = utxos.iter().map(|u| u.amount_sat).sum();
        let list: Vec<Value> = utxos.iter().map(utxo_json).collect();
        Ok(json!({
            "total_utxos": list.len(),
            "total_amount_sat": total,
            "utxos": list,
        }))
    }

    async fn get_transactions(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let client = self.slot.client()?;
        let wire: WireGetTransactionsArgs = parse_args("lnc_get_transactions", args)?;
        let request = GetTransactionsRequest::try_from(wire)?;
        let txs = rpc(ctx, "get transactions", client.get_transactions(request)).await?;
        let list: Vec<Value> = txs.iter().map(transaction_json).collect();
        Ok(json!({
            "total_transactions": list.len(),
            "transactions": list,
        }))
    }

    async fn estimate_fee(&self, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        let client = self.slot.client()?;
        let wire: WireEstimateFeeArgs = parse_args("lnc_estimate_fee", args)?;
        let args = EstimateFeeArgs::try_from(wire)?;
        let estimate = rpc(
            ctx,
            "get fee estimates",
            client.estimate_fee(args.target_conf),
        )
        .await?;

        let key = format!("target_{}_blocks", args.target_conf);
        Ok(json!({
            "target_conf": args.target_conf,
            "fee_estimates": {
                key: {
                    "fee_sat": estimate.fee_sat,
                    "sat_per_vbyte": estimate.sat_per_vbyte,
                }
            }
        }))
    }
}

#[async_trait]
impl ToolService for OnChainService {
    fn name(&self) -> &'static str {
        "onchain"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::read_only(
                "lnc_list_unspent",
                "List unspent transaction outputs (UTXOs) in the wallet",
                object_schema(
                    json!({
                        "min_confs": {
                            "type": "number",
                            "description": "Minimum number of confirmations",
                            "minimum": 0
                        },
                        "max_confs": {
                            "type": "number",
                            "description": "Maximum number of confirmations",
                            "minimum": 1
                        },
                        "account": {
                            "type": "string",
                            "description": "Wallet account to query (optional)"
                        }
                    }),
                    &[],
                ),
            ),
            ToolDescriptor::read_only(
                "lnc_get_transactions",
                "Get on-chain transaction history",
                object_schema(
                    json!({
                        "start_height": {
                            "type": "number",
                            "description": "Start block height",
                            "minimum": 0
                        },
                        "end_height": {
                            "type": "number",
                            "description": "End block height (-1 for chain tip)",
                            "minimum": -1
                        },
                        "account": {
                            "type": "string",
                            "description": "Wallet account to query (optional)"
                        }
                    }),
                    &[],
                ),
            ),
            ToolDescriptor::read_only(
                "lnc_estimate_fee",
                "Estimate on-chain transaction fees for a confirmation target. \
                 Any target from 1 to 144 blocks is queried directly, \
                 not only the common 1, 3, 6, 10, 20, 50 and 100.",
                object_schema(
                    json!({
                        "target_conf": {
                            "type": "number",
                            "description": "Target number of blocks for confirmation (default 6)",
                            "minimum": 1,
                            "maximum": 144
                        }
                    }),
                    &[],
                ),
            ),
        ]
    }

    async fn call(&self, tool: &str, ctx: &RequestContext, args: Value) -> LncResult<Value> {
        match tool {
            "lnc_list_unspent" => self.list_unspent(ctx, args).await,
            "lnc_get_transactions" => self.get_transactions(ctx, args).await,
            "lnc_estimate_fee" => self.estimate_fee(ctx, args).await,
            other => Err(unknown_tool(self.name(), other)),
        }
    }
}
