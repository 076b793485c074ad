//! Local-key wallet over an alloy HTTP provider.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized
//!
//! A local key has a single fixed account and never fires account or
//! network notifications.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, timeout};

use crate::blockchain::types::{ChainId, IERC20};
use crate::config::NetworkConfig;
use crate::wallet::provider::{TransferReceipt, WalletError, WalletEvent, WalletProvider, WalletResult};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "TRANSFER_PRIVATE_KEY";

/// How often the receipt is re-queried while waiting for inclusion.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound on waiting for inclusion.
const INCLUSION_TIMEOUT: Duration = Duration::from_secs(300);

/// Wallet backed by a private key and a JSON-RPC endpoint.
pub struct LocalWallet {
    address: Address,
    provider: DynProvider,
    rpc_timeout: Duration,
    events: broadcast::Sender<WalletEvent>,
}

impl LocalWallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `rpc_url` - JSON-RPC endpoint
    /// * `rpc_timeout` - Deadline for each RPC call
    pub fn from_private_key(private_key_hex: &str, rpc_url: &str, rpc_timeout: Duration) -> WalletResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| WalletError::new(format!("Invalid private key format: {}", e)))?;

        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| WalletError::new(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;

        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        let (events, _) = broadcast::channel(1);

        tracing::info!(address = %address, rpc_url = %rpc_url, "Local wallet initialized");

        Ok(Self {
            address,
            provider,
            rpc_timeout,
            events,
        })
    }

    /// Load the key from `TRANSFER_PRIVATE_KEY`.
    pub fn from_env(network: &NetworkConfig) -> WalletResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR)
            .map_err(|_| WalletError::new(format!("Environment variable {} not set", PRIVATE_KEY_ENV_VAR)))?;

        Self::from_private_key(
            &private_key,
            &network.rpc_url,
            Duration::from_secs(network.rpc_timeout_secs),
        )
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn with_timeout<T, E, F>(&self, what: &str, fut: F) -> WalletResult<T>
    where
        F: std::future::IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.rpc_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(call = what, error = %e, "RPC error");
                Err(WalletError::from_rpc(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(call = what, "RPC timeout");
                Err(WalletError::new(format!(
                    "{} timed out after {} seconds",
                    what,
                    self.rpc_timeout.as_secs()
                )))
            }
        }
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn request_accounts(&self) -> WalletResult<Vec<Address>> {
        Ok(vec![self.address])
    }

    async fn signer_address(&self) -> WalletResult<Address> {
        Ok(self.address)
    }

    async fn chain_id(&self) -> WalletResult<ChainId> {
        let id = self.with_timeout("eth_chainId", self.provider.get_chain_id()).await?;
        Ok(ChainId(id))
    }

    async fn token_decimals(&self, token: Address) -> WalletResult<u8> {
        let contract = IERC20::new(token, self.provider.clone());
        let call = contract.decimals();
        self.with_timeout("decimals", call.call()).await
    }

    async fn send_transfer(&self, token: Address, to: Address, amount: U256) -> WalletResult<TxHash> {
        let contract = IERC20::new(token, self.provider.clone());
        let call = contract.transfer(to, amount);
        let pending = self.with_timeout("transfer", call.send()).await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> WalletResult<TransferReceipt> {
        let result = timeout(INCLUSION_TIMEOUT, async {
            let mut ticker = interval(RECEIPT_POLL_INTERVAL);

            loop {
                ticker.tick().await;

                let receipt = match self
                    .with_timeout("eth_getTransactionReceipt", self.provider.get_transaction_receipt(tx_hash))
                    .await?
                {
                    Some(r) => r,
                    None => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction not yet included");
                        continue;
                    }
                };

                return Ok(TransferReceipt {
                    block_number: receipt.block_number.unwrap_or_default(),
                    succeeded: receipt.status(),
                });
            }
        })
        .await;

        match result {
            Ok(receipt) => receipt,
            Err(_) => Err(WalletError::new(format!(
                "transaction {} not included after {} seconds",
                tx_hash,
                INCLUSION_TIMEOUT.as_secs()
            ))),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .field("timeout_secs", &self.rpc_timeout.as_secs())
            .finish()
    }
}
