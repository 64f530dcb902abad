//! Read-only Lightning tools.
//!
//! One service per area of the node API. Every service reads the active
//! connection from the shared [`ConnectionSlot`] at call time, so a
//! reconnect is picked up by the next call without re-registration.
//! Query tools fail with `NotConnected` before any RPC when the slot is
//! empty.

pub mod channels;
pub mod connection;
pub mod invoices;
pub mod node;
pub mod onchain;
pub mod payments;
pub mod peers;

use lnc_core::{LncError, LncResult, RequestContext};
use lnc_tunnel::{ConnectionSlot, TunnelNegotiator};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::registry::ToolService;

pub use channels::ChannelService;
pub use connection::ConnectionService;
pub use invoices::InvoiceService;
pub use node::NodeService;
pub use onchain::OnChainService;
pub use payments::PaymentService;
pub use peers::PeerService;

/// Every service the read-only server exposes, in advertisement order.
pub fn read_only_services(
    slot: Arc<ConnectionSlot>,
    negotiator: Arc<TunnelNegotiator>,
    connect_timeout: Duration,
) -> Vec<Arc<dyn ToolService>> {
    vec![
        Arc::new(ConnectionService::new(
            Arc::clone(&slot),
            negotiator,
            connect_timeout,
        )),
        Arc::new(NodeService::new(Arc::clone(&slot))),
        Arc::new(InvoiceService::new(Arc::clone(&slot))),
        Arc::new(ChannelService::new(Arc::clone(&slot))),
        Arc::new(PaymentService::new(Arc::clone(&slot))),
        Arc::new(PeerService::new(Arc::clone(&slot))),
        Arc::new(OnChainService::new(slot)),
    ]
}

/// Await a node RPC under the request context, reporting failures as
/// `failed to <operation>: <cause>`.
pub(crate) async fn rpc<T, F>(ctx: &RequestContext, operation: &str, fut: F) -> LncResult<T>
where
    F: Future<Output = LncResult<T>>,
{
    ctx.run(fut).await?.map_err(|e| match e {
        LncError::Rpc { message, .. } => LncError::rpc(operation, message),
        LncError::Cancelled(_) | LncError::NotConnected => e,
        other => LncError::rpc(operation, other),
    })
}

/// JSON schema for an object with the given properties.
pub(crate) fn object_schema(properties: Value, required: &[&str]) -> Value {
    if required.is_empty() {
        json!({"type": "object", "properties": properties})
    } else {
        json!({"type": "object", "properties": properties, "required": required})
    }
}

pub(crate) fn unknown_tool(service: &str, tool: &str) -> LncError {
    LncError::Unknown(format!("{} service has no tool {}", service, tool))
}
