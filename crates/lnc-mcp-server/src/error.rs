use thiserror::Error;

/// Error type for the server binary, aggregating the workspace crates'
/// errors with configuration and IO failures.
#[derive(Debug, Error)]
pub enum RootError {
    #[error("mcp error: {0}")]
    Mcp(#[from] lnc_mcp::McpError),

    #[error("lightning error: {0}")]
    Lightning(#[from] lnc_core::LncError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for RootError {
    fn from(e: serde_json::Error) -> Self {
        RootError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for RootError {
    fn from(e: toml::de::Error) -> Self {
        RootError::Config(format!("TOML parse error: {}", e))
    }
}

impl From<toml::ser::Error> for RootError {
    fn from(e: toml::ser::Error) -> Self {
        RootError::Serialization(e.to_string())
    }
}

pub type RootResult<T> = Result<T, RootError>;
