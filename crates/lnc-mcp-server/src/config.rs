use lnc_mcp::McpServerConfig;
use lnc_tunnel::{NegotiatorConfig, DEFAULT_MAILBOX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RootError, RootResult};

/// Mailbox relay defaults applied when `lnc_connect` omits them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailboxConfig {
    /// Relay `host:port` used when a request names none.
    #[serde(default = "default_mailbox_server")]
    pub default_server: String,

    #[serde(default)]
    pub dev_mode: bool,

    /// Skip relay certificate verification. Only honoured with `dev_mode`.
    #[serde(default)]
    pub insecure: bool,

    /// Bound on the connector call and on the liveness check, each.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Accepted for compatibility; negotiation makes a single attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Deadline for a whole `lnc_connect` call.
    #[serde(default = "default_connect_tool_timeout")]
    pub connect_tool_timeout_secs: u64,
}

fn default_mailbox_server() -> String {
    DEFAULT_MAILBOX.to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_connect_tool_timeout() -> u64 {
    45
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            default_server: default_mailbox_server(),
            dev_mode: false,
            insecure: false,
            connect_timeout_secs: default_connect_timeout(),
            max_retries: default_max_retries(),
            connect_tool_timeout_secs: default_connect_tool_timeout(),
        }
    }
}

/// Top-level configuration for the server binary.
///
/// Loaded from an optional TOML file (typically `~/.lnc-mcp/config.toml`),
/// then overridden from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server name advertised in MCP initialization.
    #[serde(default = "default_server_name")]
    pub server_name: String,

    #[serde(default = "default_server_version")]
    pub server_version: String,

    /// Human-readable debug logs instead of JSON at info.
    #[serde(default = "default_development")]
    pub development: bool,

    /// Deadline for tools that declare none of their own.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Upper bound on the whole shutdown sequence.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    #[serde(default)]
    pub mailbox: MailboxConfig,
}

fn default_server_name() -> String {
    "lnc-mcp-server".to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_development() -> bool {
    true
}

fn default_tool_timeout() -> u64 {
    30
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// Returns `$HOME/<suffix>` if HOME is available, otherwise `./<suffix>`.
fn dirs_or_default(suffix: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(suffix))
        .unwrap_or_else(|_| PathBuf::from(suffix))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            server_version: default_server_version(),
            development: default_development(),
            tool_timeout_secs: default_tool_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            mailbox: MailboxConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file, apply environment overrides and
    /// validate. A missing file yields the defaults.
    pub fn load(path: &Path) -> RootResult<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`ServerConfig::load`] with an explicit environment lookup.
    pub fn load_with<F>(path: &Path, lookup: F) -> RootResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(RootError::Io)?;
            toml::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_with(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Write the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> RootResult<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(RootError::Io)?;
        }
        std::fs::write(path, contents).map_err(RootError::Io)?;
        Ok(())
    }

    /// Apply environment overrides. Values that fail to parse leave the
    /// current setting in place. Where two variables name the same setting
    /// the later one in each pair wins.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DEVELOPMENT").and_then(|v| parse_bool(&v)) {
            self.development = v;
        }

        for key in ["LNC_MAILBOX_SERVER", "LNC_DEFAULT_MAILBOX"] {
            if let Some(v) = lookup(key) {
                let v = v.trim();
                if !v.is_empty() {
                    self.mailbox.default_server = v.to_string();
                }
            }
        }
        for key in ["LNC_DEV_MODE", "LNC_DEFAULT_DEV_MODE"] {
            if let Some(v) = lookup(key).and_then(|v| parse_bool(&v)) {
                self.mailbox.dev_mode = v;
            }
        }
        for key in ["LNC_INSECURE", "LNC_DEFAULT_INSECURE"] {
            if let Some(v) = lookup(key).and_then(|v| parse_bool(&v)) {
                self.mailbox.insecure = v;
            }
        }

        if let Some(secs) = lookup("LNC_CONNECT_TIMEOUT").and_then(|v| v.trim().parse().ok()) {
            self.mailbox.connect_timeout_secs = secs;
        }
        if let Some(d) = lookup("LNC_CONNECTION_TIMEOUT").and_then(|v| parse_duration(&v).ok()) {
            self.mailbox.connect_timeout_secs = whole_seconds(d);
        }
        if let Some(n) = lookup("LNC_MAX_RETRIES").and_then(|v| v.trim().parse().ok()) {
            self.mailbox.max_retries = n;
        }
        if let Some(d) = lookup("SHUTDOWN_TIMEOUT").and_then(|v| parse_duration(&v).ok()) {
            self.shutdown_timeout_secs = whole_seconds(d);
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> RootResult<()> {
        if self.server_name.trim().is_empty() {
            return Err(RootError::Config("server_name must not be empty".into()));
        }
        if self.mailbox.default_server.trim().is_empty() {
            return Err(RootError::Config(
                "mailbox.default_server must not be empty".into(),
            ));
        }
        for (name, value) in [
            ("tool_timeout_secs", self.tool_timeout_secs),
            ("shutdown_timeout_secs", self.shutdown_timeout_secs),
            ("mailbox.connect_timeout_secs", self.mailbox.connect_timeout_secs),
            (
                "mailbox.connect_tool_timeout_secs",
                self.mailbox.connect_tool_timeout_secs,
            ),
        ] {
            if value == 0 {
                return Err(RootError::Config(format!("{} must be > 0", name)));
            }
        }
        Ok(())
    }

    pub fn negotiator_config(&self) -> NegotiatorConfig {
        NegotiatorConfig {
            default_mailbox: self.mailbox.default_server.clone(),
            default_dev_mode: self.mailbox.dev_mode,
            default_insecure: self.mailbox.insecure,
            connect_timeout: Duration::from_secs(self.mailbox.connect_timeout_secs),
            ..NegotiatorConfig::default()
        }
    }

    pub fn mcp_config(&self) -> McpServerConfig {
        McpServerConfig {
            server_name: self.server_name.clone(),
            server_version: self.server_version.clone(),
            tool_timeout_secs: self.tool_timeout_secs,
        }
    }

    pub fn connect_tool_timeout(&self) -> Duration {
        Duration::from_secs(self.mailbox.connect_tool_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Return the path to the default config file location.
    pub fn default_config_path() -> PathBuf {
        dirs_or_default(".lnc-mcp/config.toml")
    }
}

/// Parse a duration such as `500ms`, `30s`, `2m` or `1h`. A bare number is
/// taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let (num_str, unit) = if let Some(n) = s.strip_suffix("ms") {
        (n, "ms")
    } else if let Some(n) = s.strip_suffix('s') {
        (n, "s")
    } else if let Some(n) = s.strip_suffix('m') {
        (n, "m")
    } else if let Some(n) = s.strip_suffix('h') {
        (n, "h")
    } else {
        (s.as_str(), "s")
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid number: {num_str}"))?;

    let duration = match unit {
        "ms" => Duration::from_millis(num),
        "s" => Duration::from_secs(num),
        "m" => Duration::from_secs(num.saturating_mul(60)),
        "h" => Duration::from_secs(num.saturating_mul(3600)),
        _ => return Err(format!("unknown unit: {unit}")),
    };
    Ok(duration)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Rounds up so a sub-second duration never becomes zero.
fn whole_seconds(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}
