//! Network guard: the connected chain must be the configured target.

use thiserror::Error;

use crate::blockchain::types::ChainId;
use crate::config::NetworkConfig;

/// The wallet is connected to a chain other than the expected one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Please connect to the {expected_name} network (chain id {expected}); wallet reported chain id {actual}")]
pub struct NetworkMismatch {
    pub expected: ChainId,
    pub expected_name: String,
    pub actual: ChainId,
}

/// Pure comparison against the configured chain id.
#[derive(Debug, Clone)]
pub struct NetworkGuard {
    expected: ChainId,
    display_name: String,
}

impl NetworkGuard {
    pub fn new(expected: impl Into<ChainId>, display_name: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            display_name: display_name.into(),
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(config.expected_chain_id, config.display_name.clone())
    }

    /// Check the chain the wallet currently reports.
    pub fn check(&self, current: ChainId) -> Result<(), NetworkMismatch> {
        if current == self.expected {
            return Ok(());
        }
        Err(NetworkMismatch {
            expected: self.expected,
            expected_name: self.display_name.clone(),
            actual: current,
        })
    }

    pub fn expected(&self) -> ChainId {
        self.expected
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}
