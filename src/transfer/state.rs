//! Transfer lifecycle state machine.
//!
//! # States
//! - idle: no transfer yet
//! - awaiting_wallet_confirmation / awaiting_receipt: signing, then inclusion
//! - pending: included, backend checks running
//! - success / failed / error: terminal
//!
//! # State Transitions
//! ```text
//! idle → awaiting_wallet_confirmation → awaiting_receipt → pending → success
//!                   │                          │              ├─→ failed
//!                   └──────────→ error ←───────┴──────────────┘
//! ```
//! `pending → pending` is allowed (another backend check). Terminal states
//! never transition; a new submission starts a new record.

use alloy::primitives::TxHash;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    AwaitingWalletConfirmation,
    AwaitingReceipt,
    Pending,
    Success,
    Failed,
    Error,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::AwaitingWalletConfirmation => "awaiting_wallet_confirmation",
            LifecycleState::AwaitingReceipt => "awaiting_receipt",
            LifecycleState::Pending => "pending",
            LifecycleState::Success => "success",
            LifecycleState::Failed => "failed",
            LifecycleState::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Success | LifecycleState::Failed | LifecycleState::Error
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (*self, next),
            (Idle, AwaitingWalletConfirmation)
                | (AwaitingWalletConfirmation, AwaitingReceipt)
                | (AwaitingWalletConfirmation, Error)
                | (AwaitingReceipt, Pending)
                | (AwaitingReceipt, Error)
                | (Pending, Pending)
                | (Pending, Success)
                | (Pending, Failed)
                | (Pending, Error)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal lifecycle transition {from} → {to}")]
pub struct IllegalTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Bookkeeping for one submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRecord {
    pub id: Uuid,
    pub transaction_hash: Option<TxHash>,
    pub state: LifecycleState,
    pub last_error: Option<String>,
    /// Backend status checks observed so far.
    pub poll_checks: u32,
}

impl TransferRecord {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_hash: None,
            state: LifecycleState::Idle,
            last_error: None,
            poll_checks: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `next`, rejecting regressions and skips.
    pub fn transition(&mut self, next: LifecycleState) -> Result<(), IllegalTransition> {
        if !self.state.can_transition_to(next) {
            return Err(IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Move to `error` and record why.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), IllegalTransition> {
        self.transition(LifecycleState::Error)?;
        self.last_error = Some(message.into());
        Ok(())
    }
}

impl Default for TransferRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// One step in the history of a transfer record.
///
/// Unlike the record snapshot, this stream keeps every step, so observers
/// see each transition and each backend check in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferEvent {
    /// A fresh `idle` record replaced the previous one.
    Started { record_id: Uuid },
    StateChanged {
        record_id: Uuid,
        from: LifecycleState,
        to: LifecycleState,
    },
    /// The wallet returned a transaction hash.
    Broadcast { record_id: Uuid, tx_hash: TxHash },
    /// A backend check returned an envelope. `status` is `None` when the
    /// payload had no status field.
    Checked {
        record_id: Uuid,
        attempt: u32,
        status: Option<String>,
    },
}

impl TransferEvent {
    pub fn record_id(&self) -> Uuid {
        match self {
            TransferEvent::Started { record_id }
            | TransferEvent::StateChanged { record_id, .. }
            | TransferEvent::Broadcast { record_id, .. }
            | TransferEvent::Checked { record_id, .. } => *record_id,
        }
    }
}
