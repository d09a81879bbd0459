//! Exchange client configuration.

use serde::{Deserialize, Serialize};

/// Which exchange adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeMode {
    /// Accept every trade locally.
    #[default]
    Simulated,
    /// Binance spot testnet REST API.
    BinanceTestnet,
}

/// Exchange configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Adapter selection.
    #[serde(default)]
    pub mode: ExchangeMode,
    /// REST base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key.
    #[serde(default)]
    pub api_key: String,
    /// API secret used for request signing.
    #[serde(default)]
    pub api_secret: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Signed request validity window in milliseconds.
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    /// Artificial latency of the simulated exchange in milliseconds.
    #[serde(default)]
    pub simulated_latency_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            mode: ExchangeMode::default(),
            base_url: default_base_url(),
            api_key: String::new(),
            api_secret: String::new(),
            timeout_ms: default_timeout_ms(),
            recv_window_ms: default_recv_window_ms(),
            simulated_latency_ms: 0,
        }
    }
}

fn default_base_url() -> String {
    "https://testnet.binance.vision".to_string()
}

const fn default_timeout_ms() -> u64 {
    10_000
}

const fn default_recv_window_ms() -> u64 {
    5000
}
