use std::fmt;
use thiserror::Error;

use crate::context::CancelReason;

/// Coarse error classification surfaced to callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Unknown,
    ConnectionFailed,
    InvalidPairingPhrase,
    Timeout,
    NotConnected,
    InvalidInvoice,
    InsufficientBalance,
    InvalidAddress,
    ServerShutdown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unknown => "Unknown",
            ErrorCode::ConnectionFailed => "ConnectionFailed",
            ErrorCode::InvalidPairingPhrase => "InvalidPairingPhrase",
            ErrorCode::Timeout => "Timeout",
            ErrorCode::NotConnected => "NotConnected",
            ErrorCode::InvalidInvoice => "InvalidInvoice",
            ErrorCode::InsufficientBalance => "InsufficientBalance",
            ErrorCode::InvalidAddress => "InvalidAddress",
            ErrorCode::ServerShutdown => "ServerShutdown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum LncError {
    // -- Connection establishment --
    #[error("failed to establish Lightning Network connection: {0}")]
    ConnectionFailed(String),

    #[error("invalid pairing phrase: {0}")]
    InvalidPairingPhrase(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("operation cancelled: {0}")]
    Cancelled(CancelReason),

    #[error("not connected to Lightning node. Use lnc_connect first")]
    NotConnected,

    // -- Argument validation --
    #[error("invalid invoice format: {0}")]
    InvalidInvoice(String),

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("invalid address format: {0}")]
    InvalidAddress(String),

    #[error("{0}")]
    InvalidArgument(String),

    // -- Node / process --
    #[error("failed to {operation}: {message}")]
    Rpc { operation: String, message: String },

    #[error("server is shutting down")]
    ServerShutdown,

    #[error("internal error: {0}")]
    Unknown(String),
}

impl LncError {
    /// Wrap an RPC failure with the operation it belonged to.
    pub fn rpc(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        LncError::Rpc {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            LncError::ConnectionFailed(_) => ErrorCode::ConnectionFailed,
            LncError::InvalidPairingPhrase(_) => ErrorCode::InvalidPairingPhrase,
            LncError::Timeout(_) => ErrorCode::Timeout,
            LncError::Cancelled(CancelReason::DeadlineExceeded) => ErrorCode::Timeout,
            LncError::Cancelled(CancelReason::Shutdown) => ErrorCode::ServerShutdown,
            LncError::NotConnected => ErrorCode::NotConnected,
            LncError::InvalidInvoice(_) => ErrorCode::InvalidInvoice,
            LncError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            LncError::InvalidAddress(_) => ErrorCode::InvalidAddress,
            LncError::ServerShutdown => ErrorCode::ServerShutdown,
            LncError::InvalidArgument(_) | LncError::Rpc { .. } | LncError::Unknown(_) => {
                ErrorCode::Unknown
            }
        }
    }

    /// True when the failure came from the governing deadline or shutdown
    /// rather than from the node or the relay.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, LncError::Cancelled(_))
    }
}

pub type LncResult<T> = Result<T, LncError>;
