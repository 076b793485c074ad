//! Backend status types and poll error definitions.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// JSON body returned by `GET /tx_status/{hash}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    /// Detail the backend attaches to an `error` status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusEnvelope {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            message: None,
        }
    }
}

/// Status reported by the backend for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Pending,
    Success,
    Failed,
    /// The backend itself could not determine the status.
    Error(Option<String>),
    /// A value this client does not know. Never treated as success.
    Unrecognized(String),
}

impl BackendStatus {
    /// Classify an envelope. `None` when the status field is absent.
    pub fn from_envelope(envelope: &StatusEnvelope) -> Option<Self> {
        let status = envelope.status.as_deref()?;
        Some(match status {
            "pending" => BackendStatus::Pending,
            "success" => BackendStatus::Success,
            "failed" => BackendStatus::Failed,
            "error" => BackendStatus::Error(envelope.message.clone()),
            other => BackendStatus::Unrecognized(other.to_string()),
        })
    }

    pub fn label(&self) -> &str {
        match self {
            BackendStatus::Pending => "pending",
            BackendStatus::Success => "success",
            BackendStatus::Failed => "failed",
            BackendStatus::Error(_) => "error",
            BackendStatus::Unrecognized(raw) => raw,
        }
    }
}

/// Failure to obtain a status envelope from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusFetchError {
    /// The request never produced a response (DNS, refused, timeout).
    #[error("network error: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status code.
    #[error("backend returned HTTP {0}")]
    HttpStatus(u16),

    /// The body was not a status envelope.
    #[error("invalid status payload: {0}")]
    Parse(String),
}

/// Terminal poll failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// Backend unreachable.
    #[error("Failed to fetch transaction status from backend: {0}")]
    Transport(String),

    /// First check got a non-2xx answer.
    #[error("Failed to fetch transaction status from backend: HTTP {0}")]
    HttpStatus(u16),

    /// Backend reachable but sent something that is not a status envelope.
    #[error("Malformed status payload from backend: {0}")]
    Parse(String),

    /// Envelope parsed but the status is missing or unknown.
    #[error("Received unexpected status from backend: {0}")]
    UnexpectedStatus(String),

    /// Backend reported `error` for the transaction.
    #[error("Backend could not determine transaction status: {0}")]
    Backend(String),

    #[error("Transaction status check timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<StatusFetchError> for PollError {
    fn from(err: StatusFetchError) -> Self {
        match err {
            StatusFetchError::Transport(msg) => PollError::Transport(msg),
            StatusFetchError::HttpStatus(code) => PollError::HttpStatus(code),
            StatusFetchError::Parse(msg) => PollError::Parse(msg),
        }
    }
}

/// How polling for one transaction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Success,
    Failed,
    Error(PollError),
}

impl PollOutcome {
    /// Map a status to a terminal outcome. `None` means keep polling.
    pub fn from_status(status: Option<&BackendStatus>) -> Option<Self> {
        match status {
            Some(BackendStatus::Pending) => None,
            Some(BackendStatus::Success) => Some(PollOutcome::Success),
            Some(BackendStatus::Failed) => Some(PollOutcome::Failed),
            Some(BackendStatus::Error(message)) => Some(PollOutcome::Error(PollError::Backend(
                message.clone().unwrap_or_else(|| "no detail provided".to_string()),
            ))),
            Some(BackendStatus::Unrecognized(raw)) => {
                Some(PollOutcome::Error(PollError::UnexpectedStatus(raw.clone())))
            }
            None => Some(PollOutcome::Error(PollError::UnexpectedStatus(
                "status field missing".to_string(),
            ))),
        }
    }
}
