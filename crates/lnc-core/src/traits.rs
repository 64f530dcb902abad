use async_trait::async_trait;
use std::sync::Arc;

use crate::error::LncResult;
use crate::types::{
    Channel, ChannelBalance, ChannelGraph, FeeEstimate, GetTransactionsRequest, GraphNodeInfo,
    Invoice, InvoiceList, ListChannelsRequest, ListInvoicesRequest, ListPaymentsRequest,
    ListUnspentRequest, NodeInfo, PayReq, PaymentList, Peer, PendingChannels, Transaction, Utxo,
    WalletBalance,
};

// ---------------------------------------------------------------------------
// LightningClient: the node daemon's read-only query surface
//
// Only query operations exist on this trait. Anything that moves funds or
// changes node state is absent from the type, not merely unregistered.
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LightningClient: Send + Sync {
    async fn get_info(&self) -> LncResult<NodeInfo>;
    async fn wallet_balance(&self) -> LncResult<WalletBalance>;
    async fn channel_balance(&self) -> LncResult<ChannelBalance>;
    async fn list_channels(&self, req: ListChannelsRequest) -> LncResult<Vec<Channel>>;
    async fn pending_channels(&self) -> LncResult<PendingChannels>;
    async fn list_invoices(&self, req: ListInvoicesRequest) -> LncResult<InvoiceList>;
    async fn lookup_invoice(&self, r_hash: &[u8]) -> LncResult<Invoice>;
    async fn decode_pay_req(&self, pay_req: &str) -> LncResult<PayReq>;
    async fn list_payments(&self, req: ListPaymentsRequest) -> LncResult<PaymentList>;
    async fn list_peers(&self) -> LncResult<Vec<Peer>>;
    async fn describe_graph(&self, include_unannounced: bool) -> LncResult<ChannelGraph>;
    async fn get_node_info(&self, pub_key: &str, include_channels: bool)
        -> LncResult<GraphNodeInfo>;
    async fn list_unspent(&self, req: ListUnspentRequest) -> LncResult<Vec<Utxo>>;
    async fn get_transactions(&self, req: GetTransactionsRequest) -> LncResult<Vec<Transaction>>;
    async fn estimate_fee(&self, target_conf: i32) -> LncResult<FeeEstimate>;
}

// ---------------------------------------------------------------------------
// NodeConnection: a negotiated transport to one node
//
// Closing is idempotent; implementations release the tunnel on the first
// call and ignore later ones.
// ---------------------------------------------------------------------------

pub trait NodeConnection: Send + Sync {
    fn lightning(&self) -> Arc<dyn LightningClient>;
    fn close(&self) -> LncResult<()>;
}
