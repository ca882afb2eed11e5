//! Dev server configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Port of the dedicated HMR listener when no shared listener is used.
pub const DEFAULT_HMR_PORT: u16 = 24678;

/// `Sec-WebSocket-Protocol` token that marks an HMR upgrade request.
pub const DEFAULT_HMR_PROTOCOL: &str = "kiln-hmr";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevConfig {
    /// Project root; changed html files are reported relative to it
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default)]
    pub hmr: HmrConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            mode: default_mode(),
            hmr: HmrConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl DevConfig {
    /// Check values serde cannot check.
    pub fn validate(&self) -> Result<()> {
        crate::mode::validate_mode(&self.mode)?;
        self.hmr.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HmrConfig {
    /// Sub-protocol token clients must send to be claimed by the channel
    #[serde(default = "default_subprotocol")]
    pub subprotocol: String,

    /// Host of the dedicated listener
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the dedicated listener
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path the dedicated listener accepts upgrades on
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for HmrConfig {
    fn default() -> Self {
        Self {
            subprotocol: default_subprotocol(),
            host: default_host(),
            port: default_port(),
            path: default_path(),
        }
    }
}

impl HmrConfig {
    pub fn validate(&self) -> Result<()> {
        let token_ok = !self.subprotocol.is_empty()
            && self
                .subprotocol
                .chars()
                .all(|c| c.is_ascii_graphic() && c != ',' && c != ';');
        if !token_ok {
            return Err(ConfigError::InvalidValue {
                field: "hmr.subprotocol".to_string(),
                hint: format!(
                    "'{}' is not a valid header token; use letters, digits and dashes",
                    self.subprotocol
                ),
            });
        }

        if !self.path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "hmr.path".to_string(),
                hint: format!("'{}' must start with '/'", self.path),
            });
        }

        Ok(())
    }

    /// `host:port` of the dedicated listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Directory names or `*.ext` patterns skipped by the watcher
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ignore: default_ignore(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_mode() -> String {
    "development".into()
}

fn default_subprotocol() -> String {
    DEFAULT_HMR_PROTOCOL.into()
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    DEFAULT_HMR_PORT
}

fn default_path() -> String {
    "/".into()
}

fn default_ignore() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        ".git".to_string(),
        "dist".to_string(),
        "*.log".to_string(),
    ]
}

fn default_debounce_ms() -> u64 {
    100
}
