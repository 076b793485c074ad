//! Transfer validation and submission.
//!
//! # Responsibilities
//! - Check preconditions in order, before any network call
//! - Scale the human amount to base units without floating point
//! - Invoke the transfer capability and wait for inclusion

use alloy::primitives::{Address, TxHash, U256};
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::address::parse_address;
use crate::blockchain::units::{parse_units, AmountError};
use crate::wallet::provider::{TransferReceipt, WalletError, WalletProvider};
use crate::wallet::session::{Session, TokenMeta};

/// User-supplied transfer input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub recipient: String,
    pub amount: String,
}

impl TransferRequest {
    pub fn new(recipient: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            amount: amount.into(),
        }
    }
}

/// Rejections raised before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Wallet not connected. Connect your wallet first.")]
    NotConnected,

    #[error("Invalid recipient address.")]
    InvalidRecipient,

    #[error("Missing fields: recipient and amount are required.")]
    MissingFields,

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
}

/// Failures once the wallet has been asked to sign.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Transaction rejected in wallet: {0}")]
    Rejected(String),

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Transaction failed: {0}")]
    Failed(String),

    #[error("Waiting for inclusion failed: {0}")]
    Inclusion(String),
}

impl SubmissionError {
    fn from_send(err: WalletError) -> Self {
        if err.user_rejected {
            SubmissionError::Rejected(err.describe().to_string())
        } else if let Some(reason) = err.reason {
            SubmissionError::Reverted(reason)
        } else {
            SubmissionError::Failed(err.message)
        }
    }

    fn from_wait(err: WalletError) -> Self {
        match err.reason {
            Some(reason) => SubmissionError::Reverted(reason),
            None => SubmissionError::Inclusion(err.message),
        }
    }
}

/// A validated transfer ready to be signed.
#[derive(Clone)]
pub struct PreparedTransfer {
    pub signer: Arc<dyn WalletProvider>,
    pub recipient: Address,
    pub amount: U256,
}

impl std::fmt::Debug for PreparedTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedTransfer")
            .field("recipient", &self.recipient)
            .field("amount", &self.amount)
            .finish()
    }
}

/// Handle to a broadcast transfer.
#[derive(Clone)]
pub struct TransactionHandle {
    pub hash: TxHash,
    signer: Arc<dyn WalletProvider>,
}

impl TransactionHandle {
    /// Wait for inclusion. A mined-but-reverted transaction is an error.
    pub async fn wait(&self) -> Result<TransferReceipt, SubmissionError> {
        let receipt = self
            .signer
            .wait_for_receipt(self.hash)
            .await
            .map_err(SubmissionError::from_wait)?;

        if !receipt.succeeded {
            return Err(SubmissionError::Reverted(format!(
                "transaction {} reverted in block {}",
                self.hash, receipt.block_number
            )));
        }
        Ok(receipt)
    }
}

impl std::fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionHandle").field("hash", &self.hash).finish()
    }
}

/// Validates and sends token transfers for one token contract.
#[derive(Debug, Clone)]
pub struct TransferSubmitter {
    token: Address,
}

impl TransferSubmitter {
    pub fn new(token: Address) -> Self {
        Self { token }
    }

    pub fn token(&self) -> Address {
        self.token
    }

    /// Check preconditions and convert the amount. Makes no network call.
    pub fn prepare(
        &self,
        request: &TransferRequest,
        session: &Session,
        token: &TokenMeta,
    ) -> Result<PreparedTransfer, ValidationError> {
        let signer = match (&session.account, &session.signer) {
            (Some(_), Some(signer)) => signer.clone(),
            _ => return Err(ValidationError::NotConnected),
        };

        let recipient = parse_address(&request.recipient).ok_or(ValidationError::InvalidRecipient)?;

        if request.amount.trim().is_empty() || request.recipient.is_empty() {
            return Err(ValidationError::MissingFields);
        }

        let amount = parse_units(&request.amount, token.decimals)?;

        Ok(PreparedTransfer {
            signer,
            recipient,
            amount,
        })
    }

    /// Ask the wallet to sign and broadcast the transfer.
    pub async fn send(&self, prepared: &PreparedTransfer) -> Result<TransactionHandle, SubmissionError> {
        tracing::info!(
            token = %self.token,
            recipient = %prepared.recipient,
            amount = %prepared.amount,
            "Sending token transfer"
        );

        let hash = prepared
            .signer
            .send_transfer(self.token, prepared.recipient, prepared.amount)
            .await
            .map_err(SubmissionError::from_send)?;

        tracing::info!(tx_hash = %hash, "Transfer broadcast, waiting for inclusion");
        Ok(TransactionHandle {
            hash,
            signer: prepared.signer.clone(),
        })
    }

    /// Validate then send.
    pub async fn submit(
        &self,
        request: &TransferRequest,
        session: &Session,
        token: &TokenMeta,
    ) -> Result<TransactionHandle, TransferError> {
        let prepared = self.prepare(request, session, token)?;
        Ok(self.send(&prepared).await?)
    }
}

/// Everything `submit` can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("A transfer is already in progress.")]
    Busy,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// The record was ended underneath the submission (network change or
    /// teardown).
    #[error("Transfer interrupted: {0}")]
    Interrupted(String),
}
