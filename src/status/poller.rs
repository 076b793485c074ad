//! Transaction status polling.
//!
//! # States
//! - Checking: one immediate check, reported to the caller as `pending`
//! - Pending: interval polling
//! - Terminal: success, failed or error; the interval is gone
//!
//! # State Transitions
//! ```text
//! Checking → Terminal: check returns a non-pending status, or the check
//!                      fails in any way (no interval is started)
//! Checking → Pending:  check returns "pending"
//! Pending → Pending:   tick returns "pending", or non-2xx (retry next tick)
//! Pending → Terminal:  tick returns a final status, missing/unknown status,
//!                      a transport failure or a malformed body
//! any → stopped:       cancellation (no further callbacks)
//! any → Terminal:      optional max duration elapsed
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::BackendConfig;
use crate::status::client::StatusSource;
use crate::status::types::{BackendStatus, PollError, PollOutcome, StatusEnvelope, StatusFetchError};

/// Shortest interval accepted; `interval_at` cannot tick at zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// One status check that produced an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollCheck {
    /// 1 for the immediate check, then one per tick.
    pub attempt: u32,
    /// `None` when the envelope had no status field.
    pub status: Option<BackendStatus>,
}

/// Polls the status backend until a terminal status is observed.
#[derive(Clone)]
pub struct StatusPoller {
    source: Arc<dyn StatusSource>,
    interval: Duration,
    max_duration: Option<Duration>,
}

impl StatusPoller {
    /// An interval below [`MIN_POLL_INTERVAL`] is raised to it.
    pub fn new(source: Arc<dyn StatusSource>, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(interval_ms = interval.as_millis() as u64, "Poll interval too short, clamping");
        }
        Self {
            source,
            interval: interval.max(MIN_POLL_INTERVAL),
            max_duration: None,
        }
    }

    pub fn from_config(source: Arc<dyn StatusSource>, config: &BackendConfig) -> Self {
        Self::new(source, config.poll_interval()).with_max_duration(config.max_poll_duration())
    }

    /// Give up with a timeout error once `max` has elapsed.
    pub fn with_max_duration(mut self, max: Option<Duration>) -> Self {
        self.max_duration = max;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `tx_hash` to a terminal outcome.
    ///
    /// `on_check` runs once per check that returned an envelope, in order.
    /// Returns `None` if `cancel` fired first; nothing is reported after
    /// that point.
    pub async fn poll<F>(&self, tx_hash: &str, cancel: &CancellationToken, mut on_check: F) -> Option<PollOutcome>
    where
        F: FnMut(&PollCheck) + Send,
    {
        // A duration past the end of the clock is unbounded.
        let deadline = self.max_duration.and_then(|max| Instant::now().checked_add(max));

        tracing::debug!(tx_hash, "Initial transaction status check");
        let first = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = sleep_until_deadline(deadline) => return Some(self.timed_out(tx_hash)),
            result = self.source.fetch_status(tx_hash) => result,
        };

        match first {
            Ok(envelope) => {
                if let Some(outcome) = self.observe(tx_hash, 1, &envelope, &mut on_check) {
                    return Some(outcome);
                }
            }
            Err(e) => {
                tracing::warn!(tx_hash, error = %e, "Initial status check failed, not polling");
                return Some(PollOutcome::Error(e.into()));
            }
        }

        tracing::info!(
            tx_hash,
            interval_ms = self.interval.as_millis() as u64,
            "Transaction pending, polling backend"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempt = 1u32;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = sleep_until_deadline(deadline) => return Some(self.timed_out(tx_hash)),
                _ = ticker.tick() => {}
            }

            attempt += 1;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = sleep_until_deadline(deadline) => return Some(self.timed_out(tx_hash)),
                result = self.source.fetch_status(tx_hash) => result,
            };

            match result {
                Ok(envelope) => {
                    if let Some(outcome) = self.observe(tx_hash, attempt, &envelope, &mut on_check) {
                        return Some(outcome);
                    }
                }
                Err(StatusFetchError::HttpStatus(code)) => {
                    tracing::warn!(tx_hash, attempt, status = code, "Backend request failed, retrying on next tick");
                }
                Err(e) => {
                    tracing::error!(tx_hash, attempt, error = %e, "Status polling failed");
                    return Some(PollOutcome::Error(e.into()));
                }
            }
        }
    }

    fn observe<F>(&self, tx_hash: &str, attempt: u32, envelope: &StatusEnvelope, on_check: &mut F) -> Option<PollOutcome>
    where
        F: FnMut(&PollCheck),
    {
        let status = BackendStatus::from_envelope(envelope);
        tracing::debug!(
            tx_hash,
            attempt,
            status = status.as_ref().map(|s| s.label()).unwrap_or("<missing>"),
            "Status check"
        );

        on_check(&PollCheck {
            attempt,
            status: status.clone(),
        });

        let outcome = PollOutcome::from_status(status.as_ref())?;
        match &outcome {
            PollOutcome::Error(e) => tracing::warn!(tx_hash, attempt, error = %e, "Polling finished with error"),
            _ => tracing::info!(tx_hash, attempt, outcome = ?outcome, "Polling finished"),
        }
        Some(outcome)
    }

    fn timed_out(&self, tx_hash: &str) -> PollOutcome {
        let max = self.max_duration.unwrap_or_default();
        tracing::warn!(tx_hash, max_secs = max.as_secs(), "Status polling timed out");
        PollOutcome::Error(PollError::TimedOut(max))
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
