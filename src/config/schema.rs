//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the transfer
//! client. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the transfer client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TransferConfig {
    /// Target network the wallet must be connected to.
    pub network: NetworkConfig,

    /// Token contract settings.
    pub token: TokenConfig,

    /// Settlement/indexing backend settings.
    pub backend: BackendConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl TransferConfig {
    /// Block explorer link for a transaction hash. Display only.
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("https://{}/tx/{}", self.network.explorer_host, tx_hash)
    }
}

/// Expected network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Chain ID the wallet must report (11155111 for Sepolia).
    pub expected_chain_id: u64,

    /// Human-readable network name used in mismatch messages.
    pub display_name: String,

    /// Block explorer host (e.g., "sepolia.etherscan.io").
    pub explorer_host: String,

    /// JSON-RPC endpoint URL used by the local wallet.
    pub rpc_url: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            expected_chain_id: 11_155_111,
            display_name: "Sepolia".to_string(),
            explorer_host: "sepolia.etherscan.io".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            rpc_timeout_secs: 10,
        }
    }
}

/// Token contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Address of the ERC-20 token contract.
    pub contract_address: String,

    /// Decimals assumed until the contract has been queried.
    pub default_decimals: u8,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            default_decimals: 18,
        }
    }
}

/// Status backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the status service.
    pub base_url: String,

    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Upper bound on how long a transaction is polled. Unbounded when absent.
    pub max_poll_duration_secs: Option<u64>,
}

impl BackendConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn max_poll_duration(&self) -> Option<Duration> {
        self.max_poll_duration_secs.map(Duration::from_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            poll_interval_ms: 3000,
            request_timeout_secs: 10,
            max_poll_duration_secs: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record counters through the metrics facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}
