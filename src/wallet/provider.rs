//! The wallet capability consumed by the session and the submitter.
//!
//! Key custody, signing and chain RPC live behind this trait. The transfer
//! pipeline only ever sees accounts, a chain id, a transaction hash and a
//! receipt.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use std::fmt;
use tokio::sync::broadcast;

use crate::blockchain::types::ChainId;

/// Notifications the wallet environment can fire at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The set of authorised accounts changed. Empty means disconnected.
    AccountsChanged(Vec<Address>),
    /// The wallet switched to another chain.
    ChainChanged(ChainId),
}

/// Outcome of waiting for a transaction to be included in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub block_number: u64,
    /// `false` when the transaction was mined but reverted.
    pub succeeded: bool,
}

/// Error reported by the wallet capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletError {
    /// Raw error message.
    pub message: String,
    /// Revert reason decoded from the chain, when there is one.
    pub reason: Option<String>,
    /// The user declined the request in the wallet.
    pub user_rejected: bool,
}

impl WalletError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reason: None,
            user_rejected: false,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            user_rejected: true,
            ..Self::new(message)
        }
    }

    pub fn reverted(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::new(message)
        }
    }

    /// Classify a raw RPC error message.
    ///
    /// EIP-1193 code 4001 is a user rejection; `execution reverted: <reason>`
    /// carries a revert reason.
    pub fn from_rpc(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("user rejected") || lower.contains("user denied") || lower.contains("4001") {
            return Self::rejected(message);
        }

        if let Some(idx) = message.find("execution reverted") {
            let reason = message[idx + "execution reverted".len()..]
                .trim_start_matches(':')
                .trim()
                .to_string();
            if !reason.is_empty() {
                return Self::reverted(message, reason);
            }
        }

        Self::new(message)
    }

    /// The revert reason if present, else the raw message.
    pub fn describe(&self) -> &str {
        self.reason.as_deref().unwrap_or(&self.message)
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

impl std::error::Error for WalletError {}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;

/// Wallet capability: account access, signing and chain access.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the user to authorise account access.
    async fn request_accounts(&self) -> WalletResult<Vec<Address>>;

    /// Address of the active signer.
    async fn signer_address(&self) -> WalletResult<Address>;

    /// Chain the wallet is currently connected to.
    async fn chain_id(&self) -> WalletResult<ChainId>;

    /// Read-only `decimals()` call on the token contract.
    async fn token_decimals(&self, token: Address) -> WalletResult<u8>;

    /// Sign and broadcast `transfer(to, amount)` on the token contract.
    async fn send_transfer(&self, token: Address, to: Address, amount: U256) -> WalletResult<TxHash>;

    /// Block until the transaction is included.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> WalletResult<TransferReceipt>;

    /// Register for account/network notifications.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}
