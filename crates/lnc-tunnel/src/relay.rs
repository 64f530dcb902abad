use lnc_core::{LncError, LncResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Production LNC mailbox relay.
pub const DEFAULT_MAILBOX: &str = "mailbox.terminal.lightning.today:443";

const LOOPBACK_PREFIXES: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// `host:port` of a mailbox relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayAddress(String);

impl RelayAddress {
    pub fn parse(raw: &str) -> LncResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LncError::InvalidAddress("mailbox address is empty".into()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(LncError::InvalidAddress(format!(
                "mailbox address contains whitespace: {}",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_loopback(&self) -> bool {
        LOOPBACK_PREFIXES.iter().any(|p| self.0.starts_with(p))
    }
}

impl Default for RelayAddress {
    fn default() -> Self {
        Self(DEFAULT_MAILBOX.to_string())
    }
}

impl fmt::Display for RelayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DevMode,
    Insecure,
    Loopback,
}

/// Certificate policy for one relay session.
///
/// Scoped to the session it is handed to; nothing process-wide changes
/// when verification is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RelayTls {
    Verified,
    SkipVerification { reason: SkipReason },
}

impl RelayTls {
    pub fn verifies_certificates(&self) -> bool {
        matches!(self, RelayTls::Verified)
    }
}

impl fmt::Display for RelayTls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayTls::Verified => write!(f, "verified"),
            RelayTls::SkipVerification { reason } => {
                let why = match reason {
                    SkipReason::DevMode => "dev mode",
                    SkipReason::Insecure => "insecure flag",
                    SkipReason::Loopback => "loopback relay",
                };
                write!(f, "skip-verify ({})", why)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySettings {
    pub address: RelayAddress,
    pub tls: RelayTls,
}

impl RelaySettings {
    pub fn resolve(address: RelayAddress, dev_mode: bool, insecure: bool) -> Self {
        let tls = if dev_mode {
            RelayTls::SkipVerification {
                reason: SkipReason::DevMode,
            }
        } else if insecure {
            RelayTls::SkipVerification {
                reason: SkipReason::Insecure,
            }
        } else if address.is_loopback() {
            RelayTls::SkipVerification {
                reason: SkipReason::Loopback,
            }
        } else {
            RelayTls::Verified
        };
        Self { address, tls }
    }
}
