//! Read-only node RPC data model.
//!
//! These mirror the subset of the node daemon's query surface the server
//! reads. Field names follow the daemon's wire names so responses can be
//! reshaped without renaming.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Node identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub chain: String,
    pub network: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub identity_pubkey: String,
    pub alias: String,
    pub color: String,
    pub version: String,
    pub num_peers: u32,
    pub num_active_channels: u32,
    pub num_inactive_channels: u32,
    pub num_pending_channels: u32,
    pub synced_to_chain: bool,
    pub synced_to_graph: bool,
    pub block_height: u32,
    pub block_hash: String,
    pub chains: Vec<Chain>,
}

impl NodeInfo {
    /// Network of the first advertised chain, or "unknown".
    pub fn primary_network(&self) -> &str {
        self.chains
            .first()
            .map(|c| c.network.as_str())
            .unwrap_or("unknown")
    }
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub total_balance: i64,
    pub confirmed_balance: i64,
    pub unconfirmed_balance: i64,
    pub locked_balance: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub sat: u64,
    pub msat: u64,
}

impl Amount {
    pub fn from_sat(sat: u64) -> Self {
        Self {
            sat,
            msat: sat.saturating_mul(1000),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBalance {
    /// Sum of local channel balances in satoshis (legacy aggregate).
    pub balance: i64,
    pub pending_open_balance: i64,
    pub local_balance: Amount,
    pub remote_balance: Amount,
    pub unsettled_local_balance: Amount,
    pub unsettled_remote_balance: Amount,
    pub pending_open_local_balance: Amount,
    pub pending_open_remote_balance: Amount,
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConstraints {
    pub csv_delay: u32,
    pub chan_reserve_sat: u64,
    pub dust_limit_sat: u64,
    pub max_pending_amt_msat: u64,
    pub min_htlc_msat: u64,
    pub max_accepted_htlcs: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub active: bool,
    pub remote_pubkey: String,
    pub channel_point: String,
    pub chan_id: u64,
    pub capacity: i64,
    pub local_balance: i64,
    pub remote_balance: i64,
    pub commit_fee: i64,
    pub commit_weight: i64,
    pub fee_per_kw: i64,
    pub unsettled_balance: i64,
    pub total_satoshis_sent: i64,
    pub total_satoshis_received: i64,
    pub num_updates: u64,
    pub pending_htlcs: u32,
    pub private: bool,
    pub initiator: bool,
    pub chan_status_flags: String,
    pub local_constraints: Option<ChannelConstraints>,
    pub remote_constraints: Option<ChannelConstraints>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListChannelsRequest {
    pub active_only: bool,
    pub inactive_only: bool,
    pub public_only: bool,
    pub private_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChannel {
    pub remote_node_pub: String,
    pub channel_point: String,
    pub capacity: i64,
    pub local_balance: i64,
    pub remote_balance: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOpenChannel {
    pub channel: PendingChannel,
    pub commit_fee: i64,
    pub commit_weight: i64,
    pub fee_per_kw: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceClosedChannel {
    pub channel: PendingChannel,
    pub closing_txid: String,
    pub limbo_balance: i64,
    pub maturity_height: u32,
    pub blocks_til_maturity: i32,
    pub recovered_balance: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingCloseChannel {
    pub channel: PendingChannel,
    pub limbo_balance: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChannels {
    pub total_limbo_balance: i64,
    pub pending_open_channels: Vec<PendingOpenChannel>,
    pub pending_force_closing_channels: Vec<ForceClosedChannel>,
    pub waiting_close_channels: Vec<WaitingCloseChannel>,
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceState {
    #[default]
    Open,
    Settled,
    Canceled,
    Accepted,
}

impl fmt::Display for InvoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceState::Open => write!(f, "OPEN"),
            InvoiceState::Settled => write!(f, "SETTLED"),
            InvoiceState::Canceled => write!(f, "CANCELED"),
            InvoiceState::Accepted => write!(f, "ACCEPTED"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub memo: String,
    pub payment_request: String,
    /// Payment hash bytes.
    pub r_hash: Vec<u8>,
    pub value: i64,
    pub value_msat: i64,
    pub creation_date: i64,
    pub settle_date: i64,
    pub expiry: i64,
    pub cltv_expiry: u64,
    pub private: bool,
    pub add_index: u64,
    pub settle_index: u64,
    pub amt_paid_sat: i64,
    pub amt_paid_msat: i64,
    pub state: InvoiceState,
    pub is_keysend: bool,
    pub payment_addr: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListInvoicesRequest {
    pub pending_only: bool,
    pub index_offset: u64,
    pub num_max_invoices: u64,
    pub reversed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceList {
    pub invoices: Vec<Invoice>,
    pub first_index_offset: u64,
    pub last_index_offset: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub is_required: bool,
    pub is_known: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopHint {
    pub node_id: String,
    pub chan_id: u64,
    pub fee_base_msat: u32,
    pub fee_proportional_millionths: u32,
    pub cltv_expiry_delta: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHint {
    pub hop_hints: Vec<HopHint>,
}

/// A decoded BOLT11 payment request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayReq {
    pub destination: String,
    pub payment_hash: String,
    pub num_satoshis: i64,
    pub num_msat: i64,
    pub timestamp: i64,
    pub expiry: i64,
    pub description: String,
    pub description_hash: String,
    pub fallback_addr: String,
    pub cltv_expiry: i64,
    pub route_hints: Vec<RouteHint>,
    pub payment_addr: Vec<u8>,
    pub features: BTreeMap<u32, Feature>,
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unknown,
    InFlight,
    Succeeded,
    Failed,
    Initiated,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unknown => write!(f, "UNKNOWN"),
            PaymentStatus::InFlight => write!(f, "IN_FLIGHT"),
            PaymentStatus::Succeeded => write!(f, "SUCCEEDED"),
            PaymentStatus::Failed => write!(f, "FAILED"),
            PaymentStatus::Initiated => write!(f, "INITIATED"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentFailureReason {
    #[default]
    FailureReasonNone,
    FailureReasonTimeout,
    FailureReasonNoRoute,
    FailureReasonError,
    FailureReasonIncorrectPaymentDetails,
    FailureReasonInsufficientBalance,
    FailureReasonCanceled,
}

impl fmt::Display for PaymentFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentFailureReason::FailureReasonNone => "FAILURE_REASON_NONE",
            PaymentFailureReason::FailureReasonTimeout => "FAILURE_REASON_TIMEOUT",
            PaymentFailureReason::FailureReasonNoRoute => "FAILURE_REASON_NO_ROUTE",
            PaymentFailureReason::FailureReasonError => "FAILURE_REASON_ERROR",
            PaymentFailureReason::FailureReasonIncorrectPaymentDetails => {
                "FAILURE_REASON_INCORRECT_PAYMENT_DETAILS"
            }
            PaymentFailureReason::FailureReasonInsufficientBalance => {
                "FAILURE_REASON_INSUFFICIENT_BALANCE"
            }
            PaymentFailureReason::FailureReasonCanceled => "FAILURE_REASON_CANCELED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_hash: String,
    pub value_sat: i64,
    pub value_msat: i64,
    pub payment_preimage: String,
    pub payment_request: String,
    pub status: PaymentStatus,
    pub fee_sat: i64,
    pub fee_msat: i64,
    pub creation_time_ns: i64,
    pub payment_index: u64,
    pub failure_reason: PaymentFailureReason,
    pub htlc_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPaymentsRequest {
    pub include_incomplete: bool,
    pub index_offset: u64,
    pub max_payments: u64,
    pub reversed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentList {
    pub payments: Vec<Payment>,
    pub first_index_offset: u64,
    pub last_index_offset: u64,
}

// ---------------------------------------------------------------------------
// Peers and graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedError {
    pub timestamp: u64,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub pub_key: String,
    pub address: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub sat_sent: i64,
    pub sat_recv: i64,
    pub inbound: bool,
    pub ping_time: i64,
    pub sync_type: String,
    pub features: BTreeMap<u32, Feature>,
    pub errors: Vec<TimestampedError>,
    pub flap_count: i32,
    pub last_flap_ns: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    pub network: String,
    pub addr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightningNode {
    pub pub_key: String,
    pub alias: String,
    pub color: String,
    pub last_update: u32,
    pub addresses: Vec<NodeAddress>,
    pub features: BTreeMap<u32, Feature>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEdge {
    pub channel_id: u64,
    pub chan_point: String,
    pub last_update: u32,
    pub node1_pub: String,
    pub node2_pub: String,
    pub capacity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelGraph {
    pub nodes: Vec<LightningNode>,
    pub edges: Vec<ChannelEdge>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNodeInfo {
    pub node: LightningNode,
    pub num_channels: u32,
    pub total_capacity: i64,
    pub channels: Vec<ChannelEdge>,
}

// ---------------------------------------------------------------------------
// On-chain wallet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid_str: String,
    pub output_index: u32,
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid_str, self.output_index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub address_type: String,
    pub address: String,
    pub amount_sat: i64,
    pub pk_script: String,
    pub outpoint: OutPoint,
    pub confirmations: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUnspentRequest {
    pub min_confs: i32,
    pub max_confs: i32,
    pub account: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousOutPoint {
    pub outpoint: String,
    pub is_our_output: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_hash: String,
    pub amount: i64,
    pub num_confirmations: i32,
    pub block_hash: String,
    pub block_height: i32,
    pub time_stamp: i64,
    pub total_fees: i64,
    pub raw_tx_hex: String,
    pub label: String,
    pub previous_outpoints: Vec<PreviousOutPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTransactionsRequest {
    pub start_height: i32,
    /// `-1` means up to the chain tip.
    pub end_height: i32,
    pub account: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub fee_sat: i64,
    pub sat_per_vbyte: u64,
}
