use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{LncError, LncResult};
use crate::traits::{LightningClient, NodeConnection};
use crate::types::{
    Channel, ChannelBalance, ChannelGraph, FeeEstimate, GetTransactionsRequest, GraphNodeInfo,
    Invoice, InvoiceList, InvoiceState, ListChannelsRequest, ListInvoicesRequest,
    ListPaymentsRequest, ListUnspentRequest, NodeInfo, PayReq, PaymentList, PaymentStatus, Peer,
    PendingChannels, Transaction, Utxo, WalletBalance,
};

/// Node contents served by [`InMemoryLightning`].
#[derive(Debug, Clone, Default)]
pub struct NodeSnapshot {
    pub info: NodeInfo,
    pub wallet: WalletBalance,
    pub channel_balance: ChannelBalance,
    pub channels: Vec<Channel>,
    pub pending: PendingChannels,
    pub invoices: Vec<Invoice>,
    pub decoded: HashMap<String, PayReq>,
    pub payments: Vec<crate::types::Payment>,
    pub peers: Vec<Peer>,
    pub graph: ChannelGraph,
    pub utxos: Vec<Utxo>,
    pub transactions: Vec<Transaction>,
    pub fees: HashMap<i32, FeeEstimate>,
}

#[derive(Default)]
struct Script {
    failing: HashSet<&'static str>,
    get_info_delay: Option<Duration>,
    calls: Vec<&'static str>,
}

/// In-memory `LightningClient` with scriptable failures.
///
/// Useful for testing the query services and the negotiator without a
/// node. Every RPC is recorded so tests can assert which calls were made.
pub struct InMemoryLightning {
    snapshot: Mutex<NodeSnapshot>,
    script: Mutex<Script>,
}

fn lock<T>(mutex: &Mutex<T>) -> LncResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| LncError::Unknown(format!("lock poisoned: {}", e)))
}

impl InMemoryLightning {
    pub fn new(snapshot: NodeSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            script: Mutex::new(Script::default()),
        }
    }

    /// Make every call to `method` fail with an RPC error.
    pub fn fail(&self, method: &'static str) {
        if let Ok(mut script) = lock(&self.script) {
            script.failing.insert(method);
        }
    }

    /// Delay `get_info` responses, to exercise liveness timeouts.
    pub fn delay_get_info(&self, delay: Duration) {
        if let Ok(mut script) = lock(&self.script) {
            script.get_info_delay = Some(delay);
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut NodeSnapshot)) {
        if let Ok(mut snapshot) = lock(&self.snapshot) {
            f(&mut snapshot);
        }
    }

    /// RPC names in the order they were issued.
    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.script)
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.script).map(|s| s.calls.len()).unwrap_or(0)
    }

    fn enter(&self, method: &'static str) -> LncResult<()> {
        let mut script = lock(&self.script)?;
        script.calls.push(method);
        if script.failing.contains(method) {
            return Err(LncError::rpc(method, "rpc error: code = Unavailable"));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&NodeSnapshot) -> T) -> LncResult<T> {
        let snapshot = lock(&self.snapshot)?;
        Ok(f(&snapshot))
    }
}

impl Default for InMemoryLightning {
    fn default() -> Self {
        Self::new(NodeSnapshot::default())
    }
}

fn page<T: Clone>(items: &[T], offset: u64, max: u64, reversed: bool) -> Vec<T> {
    let offset = offset.min(items.len() as u64) as usize;
    let max = if max == 0 { items.len() } else { max as usize };
    if reversed {
        let end = items.len() - offset;
        let start = end.saturating_sub(max);
        items[start..end].to_vec()
    } else {
        items.iter().skip(offset).take(max).cloned().collect()
    }
}

#[async_trait]
impl LightningClient for InMemoryLightning {
    async fn get_info(&self) -> LncResult<NodeInfo> {
        self.enter("get_info")?;
        let delay = lock(&self.script)?.get_info_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.read(|s| s.info.clone())
    }

    async fn wallet_balance(&self) -> LncResult<WalletBalance> {
        self.enter("wallet_balance")?;
        self.read(|s| s.wallet.clone())
    }

    async fn channel_balance(&self) -> LncResult<ChannelBalance> {
        self.enter("channel_balance")?;
        self.read(|s| s.channel_balance.clone())
    }

    async fn list_channels(&self, req: ListChannelsRequest) -> LncResult<Vec<Channel>> {
        self.enter("list_channels")?;
        self.read(|s| {
            s.channels
                .iter()
                .filter(|c| !req.active_only || c.active)
                .filter(|c| !req.inactive_only || !c.active)
                .filter(|c| !req.public_only || !c.private)
                .filter(|c| !req.private_only || c.private)
                .cloned()
                .collect()
        })
    }

    async fn pending_channels(&self) -> LncResult<PendingChannels> {
        self.enter("pending_channels")?;
        self.read(|s| s.pending.clone())
    }

    async fn list_invoices(&self, req: ListInvoicesRequest) -> LncResult<InvoiceList> {
        self.enter("list_invoices")?;
        self.read(|s| {
            let matching: Vec<Invoice> = s
                .invoices
                .iter()
                .filter(|i| {
                    !req.pending_only
                        || matches!(i.state, InvoiceState::Open | InvoiceState::Accepted)
                })
                .cloned()
                .collect();
            let invoices = page(&matching, req.index_offset, req.num_max_invoices, req.reversed);
            InvoiceList {
                first_index_offset: invoices.first().map(|i| i.add_index).unwrap_or(0),
                last_index_offset: invoices.last().map(|i| i.add_index).unwrap_or(0),
                invoices,
            }
        })
    }

    async fn lookup_invoice(&self, r_hash: &[u8]) -> LncResult<Invoice> {
        self.enter("lookup_invoice")?;
        self.read(|s| s.invoices.iter().find(|i| i.r_hash == r_hash).cloned())?
            .ok_or_else(|| LncError::rpc("lookup_invoice", "unable to locate invoice"))
    }

    async fn decode_pay_req(&self, pay_req: &str) -> LncResult<PayReq> {
        self.enter("decode_pay_req")?;
        self.read(|s| s.decoded.get(pay_req).cloned())?
            .ok_or_else(|| LncError::rpc("decode_pay_req", "invalid payment request"))
    }

    async fn list_payments(&self, req: ListPaymentsRequest) -> LncResult<PaymentList> {
        self.enter("list_payments")?;
        self.read(|s| {
            let matching: Vec<_> = s
                .payments
                .iter()
                .filter(|p| req.include_incomplete || p.status == PaymentStatus::Succeeded)
                .cloned()
                .collect();
            let payments = page(&matching, req.index_offset, req.max_payments, req.reversed);
            PaymentList {
                first_index_offset: payments.first().map(|p| p.payment_index).unwrap_or(0),
                last_index_offset: payments.last().map(|p| p.payment_index).unwrap_or(0),
                payments,
            }
        })
    }

    async fn list_peers(&self) -> LncResult<Vec<Peer>> {
        self.enter("list_peers")?;
        self.read(|s| s.peers.clone())
    }

    async fn describe_graph(&self, _include_unannounced: bool) -> LncResult<ChannelGraph> {
        self.enter("describe_graph")?;
        self.read(|s| s.graph.clone())
    }

    async fn get_node_info(
        &self,
        pub_key: &str,
        include_channels: bool,
    ) -> LncResult<GraphNodeInfo> {
        self.enter("get_node_info")?;
        self.read(|s| {
            let node = s.graph.nodes.iter().find(|n| n.pub_key == pub_key)?.clone();
            let edges: Vec<_> = s
                .graph
                .edges
                .iter()
                .filter(|e| e.node1_pub == pub_key || e.node2_pub == pub_key)
                .cloned()
                .collect();
            Some(GraphNodeInfo {
                node,
                num_channels: edges.len() as u32,
                total_capacity: edges.iter().map(|e| e.capacity).sum(),
                channels: if include_channels { edges } else { Vec::new() },
            })
        })?
        .ok_or_else(|| LncError::rpc("get_node_info", "unable to find node"))
    }

    async fn list_unspent(&self, req: ListUnspentRequest) -> LncResult<Vec<Utxo>> {
        self.enter("list_unspent")?;
        self.read(|s| {
            s.utxos
                .iter()
                .filter(|u| {
                    u.confirmations >= i64::from(req.min_confs)
                        && u.confirmations <= i64::from(req.max_confs)
                })
                .cloned()
                .collect()
        })
    }

    async fn get_transactions(&self, req: GetTransactionsRequest) -> LncResult<Vec<Transaction>> {
        self.enter("get_transactions")?;
        self.read(|s| {
            s.transactions
                .iter()
                .filter(|t| t.block_height >= req.start_height)
                .filter(|t| req.end_height < 0 || t.block_height <= req.end_height)
                .cloned()
                .collect()
        })
    }

    async fn estimate_fee(&self, target_conf: i32) -> LncResult<FeeEstimate> {
        self.enter("estimate_fee")?;
        self.read(|s| s.fees.get(&target_conf).copied())?
            .ok_or_else(|| LncError::rpc("estimate_fee", "fee estimation unavailable"))
    }
}

/// `NodeConnection` over an [`InMemoryLightning`] that counts closes.
pub struct InMemoryConnection {
    client: Arc<InMemoryLightning>,
    closes: Arc<AtomicUsize>,
}

impl InMemoryConnection {
    pub fn new(client: Arc<InMemoryLightning>) -> Self {
        Self::with_counter(client, Arc::new(AtomicUsize::new(0)))
    }

    pub fn with_counter(client: Arc<InMemoryLightning>, closes: Arc<AtomicUsize>) -> Self {
        Self { client, closes }
    }

    /// Shared counter of `close` calls, observable after the connection
    /// has been handed off.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

impl NodeConnection for InMemoryConnection {
    fn lightning(&self) -> Arc<dyn LightningClient> {
        self.client.clone()
    }

    fn close(&self) -> LncResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Payment;

    fn invoice(add_index: u64, state: InvoiceState) -> Invoice {
        Invoice {
            add_index,
            state,
            r_hash: vec![add_index as u8; 32],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_records_calls() {
        let node = InMemoryLightning::default();
        node.get_info().await.unwrap();
        node.list_peers().await.unwrap();
        assert_eq!(node.calls(), vec!["get_info", "list_peers"]);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let node = InMemoryLightning::default();
        node.fail("wallet_balance");
        let err = node.wallet_balance().await.unwrap_err();
        assert!(err.to_string().contains("wallet_balance"));
        assert_eq!(node.call_count(), 1);
    }

    #[tokio::test]
    async fn test_pending_only_invoices() {
        let node = InMemoryLightning::default();
        node.update(|s| {
            s.invoices = vec![
                invoice(1, InvoiceState::Settled),
                invoice(2, InvoiceState::Open),
                invoice(3, InvoiceState::Accepted),
            ];
        });
        let list = node
            .list_invoices(ListInvoicesRequest {
                pending_only: true,
                num_max_invoices: 100,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(list.invoices.len(), 2);
        assert_eq!(list.first_index_offset, 2);
        assert_eq!(list.last_index_offset, 3);
    }

    #[tokio::test]
    async fn test_reversed_paging_takes_newest() {
        let node = InMemoryLightning::default();
        node.update(|s| {
            s.payments = (1..=5)
                .map(|i| Payment {
                    payment_index: i,
                    status: PaymentStatus::Succeeded,
                    ..Default::default()
                })
                .collect();
        });
        let list = node
            .list_payments(ListPaymentsRequest {
                max_payments: 2,
                reversed: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let indices: Vec<u64> = list.payments.iter().map(|p| p.payment_index).collect();
        assert_eq!(indices, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_lookup_missing_invoice() {
        let node = InMemoryLightning::default();
        assert!(node.lookup_invoice(&[0u8; 32]).await.is_err());
    }

    #[test]
    fn test_connection_counts_closes() {
        let conn = InMemoryConnection::new(Arc::new(InMemoryLightning::default()));
        let counter = conn.close_counter();
        conn.close().unwrap();
        conn.close().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
