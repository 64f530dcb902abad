//! Wire-format tool arguments.
//!
//! Every field is optional on the wire; `TryFrom` applies defaults, checks
//! required fields and ranges, and yields the typed arguments the services
//! use. Numbers arrive as JSON numbers of any flavour and must be whole.

use lnc_core::{
    GetTransactionsRequest, ListChannelsRequest, ListInvoicesRequest, ListPaymentsRequest,
    ListUnspentRequest, LncError, LncResult,
};
use lnc_tunnel::ConnectRequest;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Page size used when a listing names none.
pub const DEFAULT_PAGE_SIZE: u64 = 100;
pub const MAX_PAGE_SIZE: u64 = 1000;
pub const DEFAULT_MAX_CONFS: i32 = 9_999_999;
pub const DEFAULT_TARGET_CONF: i32 = 6;
pub const MAX_TARGET_CONF: i32 = 144;
/// Sample size for graph summaries.
pub const GRAPH_SAMPLE: usize = 5;

/// Deserialize tool arguments. `null` counts as an empty object.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> LncResult<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| LncError::InvalidArgument(format!("invalid {} arguments: {}", tool, e)))
}

fn whole(name: &str, value: f64, min: i64, max: i64) -> LncResult<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(LncError::InvalidArgument(format!(
            "{} must be a whole number",
            name
        )));
    }
    let n = value as i64;
    if n < min || n > max {
        return Err(LncError::InvalidArgument(format!(
            "{} must be between {} and {}",
            name, min, max
        )));
    }
    Ok(n)
}

fn required(name: &str, value: Option<String>) -> LncResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LncError::InvalidArgument(format!("{} is required", name))),
    }
}

fn hex_of_len(name: &str, value: Option<String>, len: usize) -> LncResult<String> {
    let value = required(name, value)?;
    let value = value.trim().to_string();
    if value.len() != len {
        return Err(LncError::InvalidArgument(format!(
            "{} must be a {}-character hex string",
            name, len
        )));
    }
    if !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LncError::InvalidArgument(format!("invalid {} format", name)));
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireConnectArgs {
    #[serde(default)]
    pub pairing_phrase: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub mailbox: Option<String>,
    #[serde(default)]
    pub dev_mode: Option<bool>,
    #[serde(default)]
    pub insecure: Option<bool>,
}

impl TryFrom<WireConnectArgs> for ConnectRequest {
    type Error = LncError;

    fn try_from(wire: WireConnectArgs) -> LncResult<Self> {
        let pairing_phrase = required("pairingPhrase", wire.pairing_phrase)?;
        let password = match wire.password {
            Some(p) if !p.is_empty() => p,
            _ => return Err(LncError::InvalidArgument("password is required".into())),
        };
        Ok(ConnectRequest {
            pairing_phrase,
            password,
            mailbox: wire.mailbox,
            dev_mode: wire.dev_mode,
            insecure: wire.insecure,
        })
    }
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireDecodeInvoiceArgs {
    #[serde(default)]
    pub invoice: Option<String>,
}

/// A BOLT11 string that passed the local shape check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeInvoiceArgs {
    pub invoice: String,
}

impl TryFrom<WireDecodeInvoiceArgs> for DecodeInvoiceArgs {
    type Error = LncError;

    fn try_from(wire: WireDecodeInvoiceArgs) -> LncResult<Self> {
        let invoice = required("invoice", wire.invoice)?.trim().to_string();
        if invoice.len() < 3 || !invoice.starts_with("ln") {
            return Err(LncError::InvalidInvoice(
                "expected a BOLT11 payment request starting with 'ln'".into(),
            ));
        }
        Ok(Self { invoice })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireListInvoicesArgs {
    #[serde(default)]
    pub pending_only: bool,
    #[serde(default)]
    pub index_offset: Option<f64>,
    #[serde(default)]
    pub num_max_invoices: Option<f64>,
    #[serde(default)]
    pub reversed: bool,
}

impl TryFrom<WireListInvoicesArgs> for ListInvoicesRequest {
    type Error = LncError;

    fn try_from(wire: WireListInvoicesArgs) -> LncResult<Self> {
        let index_offset = match wire.index_offset {
            Some(v) => whole("index_offset", v, 0, i64::MAX)? as u64,
            None => 0,
        };
        let num_max_invoices = match wire.num_max_invoices {
            Some(v) => whole("num_max_invoices", v, 1, MAX_PAGE_SIZE as i64)? as u64,
            None => DEFAULT_PAGE_SIZE,
        };
        Ok(ListInvoicesRequest {
            pending_only: wire.pending_only,
            index_offset,
            num_max_invoices,
            reversed: wire.reversed,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WirePaymentHashArgs {
    #[serde(default)]
    pub payment_hash: Option<String>,
}

/// A 32-byte payment hash, with its hex form kept for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentHashArgs {
    pub hex: String,
    pub bytes: Vec<u8>,
}

impl TryFrom<WirePaymentHashArgs> for PaymentHashArgs {
    type Error = LncError;

    fn try_from(wire: WirePaymentHashArgs) -> LncResult<Self> {
        let hex_str = hex_of_len("payment_hash", wire.payment_hash, 64)?;
        let bytes = hex::decode(&hex_str)
            .map_err(|_| LncError::InvalidArgument("invalid payment_hash format".into()))?;
        Ok(Self {
            hex: hex_str.to_ascii_lowercase(),
            bytes,
        })
    }
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireListChannelsArgs {
    #[serde(default)]
    pub active_only: bool,
    #[serde(default)]
    pub inactive_only: bool,
    #[serde(default)]
    pub public_only: bool,
    #[serde(default)]
    pub private_only: bool,
}

impl TryFrom<WireListChannelsArgs> for ListChannelsRequest {
    type Error = LncError;

    fn try_from(wire: WireListChannelsArgs) -> LncResult<Self> {
        if wire.active_only && wire.inactive_only {
            return Err(LncError::InvalidArgument(
                "active_only and inactive_only cannot both be set".into(),
            ));
        }
        if wire.public_only && wire.private_only {
            return Err(LncError::InvalidArgument(
                "public_only and private_only cannot both be set".into(),
            ));
        }
        Ok(ListChannelsRequest {
            active_only: wire.active_only,
            inactive_only: wire.inactive_only,
            public_only: wire.public_only,
            private_only: wire.private_only,
        })
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireListPaymentsArgs {
    #[serde(default)]
    pub include_incomplete: bool,
    #[serde(default)]
    pub index_offset: Option<f64>,
    #[serde(default)]
    pub max_payments: Option<f64>,
    #[serde(default)]
    pub reversed: bool,
}

impl TryFrom<WireListPaymentsArgs> for ListPaymentsRequest {
    type Error = LncError;

    fn try_from(wire: WireListPaymentsArgs) -> LncResult<Self> {
        let index_offset = match wire.index_offset {
            Some(v) => whole("index_offset", v, 0, i64::MAX)? as u64,
            None => 0,
        };
        let max_payments = match wire.max_payments {
            Some(v) => whole("max_payments", v, 1, MAX_PAGE_SIZE as i64)? as u64,
            None => DEFAULT_PAGE_SIZE,
        };
        Ok(ListPaymentsRequest {
            include_incomplete: wire.include_incomplete,
            index_offset,
            max_payments,
            reversed: wire.reversed,
        })
    }
}

// ---------------------------------------------------------------------------
// Peers and graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireDescribeGraphArgs {
    #[serde(default)]
    pub include_unannounced: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireNodeInfoArgs {
    #[serde(default)]
    pub pub_key: Option<String>,
    #[serde(default)]
    pub include_channels: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfoArgs {
    pub pub_key: String,
    pub include_channels: bool,
}

impl TryFrom<WireNodeInfoArgs> for NodeInfoArgs {
    type Error = LncError;

    fn try_from(wire: WireNodeInfoArgs) -> LncResult<Self> {
        let pub_key = hex_of_len("pub_key", wire.pub_key, 66)?;
        Ok(Self {
            pub_key: pub_key.to_ascii_lowercase(),
            include_channels: wire.include_channels,
        })
    }
}

// ---------------------------------------------------------------------------
// On-chain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireListUnspentArgs {
    #[serde(default)]
    pub min_confs: Option<f64>,
    #[serde(default)]
    pub max_confs: Option<f64>,
    #[serde(default)]
    pub account: Option<String>,
}

impl TryFrom<WireListUnspentArgs> for ListUnspentRequest {
    type Error = LncError;

    fn try_from(wire: WireListUnspentArgs) -> LncResult<Self> {
        let min_confs = match wire.min_confs {
            Some(v) => whole("min_confs", v, 0, i64::from(i32::MAX))? as i32,
            None => 0,
        };
        let max_confs = match wire.max_confs {
            Some(v) => whole("max_confs", v, 1, i64::from(i32::MAX))? as i32,
            None => DEFAULT_MAX_CONFS,
        };
        if max_confs < min_confs {
            return Err(LncError::InvalidArgument(
                "max_confs must not be less than min_confs".into(),
            ));
        }
        Ok(ListUnspentRequest {
            min_confs,
            max_confs,
            account: wire.account.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireGetTransactionsArgs {
    #[serde(default)]
    pub start_height: Option<f64>,
    #[serde(default)]
    pub end_height: Option<f64>,
    #[serde(default)]
    pub account: Option<String>,
}

impl TryFrom<WireGetTransactionsArgs> for GetTransactionsRequest {
    type Error = LncError;

    fn try_from(wire: WireGetTransactionsArgs) -> LncResult<Self> {
        let start_height = match wire.start_height {
            Some(v) => whole("start_height", v, 0, i64::from(i32::MAX))? as i32,
            None => 0,
        };
        let end_height = match wire.end_height {
            Some(v) => whole("end_height", v, -1, i64::from(i32::MAX))? as i32,
            None => -1,
        };
        if end_height >= 0 && end_height < start_height {
            return Err(LncError::InvalidArgument(
                "end_height must not be less than start_height".into(),
            ));
        }
        Ok(GetTransactionsRequest {
            start_height,
            end_height,
            account: wire.account.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireEstimateFeeArgs {
    #[serde(default)]
    pub target_conf: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateFeeArgs {
    pub target_conf: i32,
}

impl TryFrom<WireEstimateFeeArgs> for EstimateFeeArgs {
    type Error = LncError;

    fn try_from(wire: WireEstimateFeeArgs) -> LncResult<Self> {
        let target_conf = match wire.target_conf {
            Some(v) => whole("target_conf", v, 1, i64::from(MAX_TARGET_CONF))? as i32,
            None => DEFAULT_TARGET_CONF,
        };
        Ok(Self { target_conf })
    }
}
