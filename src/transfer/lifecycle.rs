//! Transfer lifecycle driver.
//!
//! # Data Flow
//! ```text
//! connect():  WalletSession → NetworkGuard → TokenMeta
//! submit():   snapshot session → TransferSubmitter::prepare (no I/O)
//!             → new TransferRecord (idle)
//!             → awaiting_wallet_confirmation → send
//!             → awaiting_receipt → wait for inclusion
//!             → pending → StatusPoller task → success | failed | error
//! ```
//!
//! Observers get the latest record from [`TransferLifecycle::subscribe`] and
//! every step, in order, from [`TransferLifecycle::events`].
//!
//! # Design Decisions
//! - One active transfer at a time; a non-terminal record rejects new
//!   submissions
//! - Each poll task writes only to the record it was started for and stops
//!   on teardown without writing
//! - A network change ends the active record with `error` and reloads the
//!   session from scratch

use alloy::primitives::{Address, TxHash};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::blockchain::address::parse_address;
use crate::blockchain::network::NetworkGuard;
use crate::config::validation::{validate_config, ValidationError};
use crate::config::{ConfigError, TransferConfig};
use crate::observability::metrics;
use crate::status::client::StatusSource;
use crate::status::poller::{PollCheck, StatusPoller};
use crate::status::types::{BackendStatus, PollOutcome};
use crate::transfer::state::{LifecycleState, TransferEvent, TransferRecord};
use crate::transfer::submitter::{TransferError, TransferRequest, TransferSubmitter};
use crate::wallet::events::EventSubscription;
use crate::wallet::provider::{WalletEvent, WalletProvider};
use crate::wallet::session::{Connected, ConnectionError, Session, SessionChange, TokenMeta, WalletSession};

/// Message recorded when a network change ends an active transfer.
pub const NETWORK_CHANGED_MESSAGE: &str = "Wallet network changed; the transfer is no longer tracked.";

/// Message recorded when the account changed between validation and signing.
pub const SESSION_CHANGED_MESSAGE: &str = "Wallet session changed before signing; submit the transfer again.";

/// Room for a full transfer history plus slack for slow observers.
const EVENT_CAPACITY: usize = 256;

struct ActivePoll {
    record_id: Uuid,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// The current record plus its step history. Every write goes through here
/// so both views stay in step.
struct RecordChannel {
    current: watch::Sender<TransferRecord>,
    events: broadcast::Sender<TransferEvent>,
}

impl RecordChannel {
    fn new() -> Self {
        let (current, _) = watch::channel(TransferRecord::new());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { current, events }
    }

    fn emit(&self, event: TransferEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn snapshot(&self) -> TransferRecord {
        self.current.borrow().clone()
    }

    fn start(&self) -> Uuid {
        let record = TransferRecord::new();
        let record_id = record.id;
        self.current.send_modify(|current| {
            *current = record;
            self.emit(TransferEvent::Started { record_id });
        });
        tracing::info!(record_id = %record_id, "Transfer record created");
        record_id
    }

    fn set_hash(&self, record_id: Uuid, tx_hash: TxHash) {
        self.current.send_if_modified(|current| {
            if current.id != record_id || current.is_terminal() {
                return false;
            }
            current.transaction_hash = Some(tx_hash);
            self.emit(TransferEvent::Broadcast { record_id, tx_hash });
            true
        });
    }

    /// Transition the record if it is still `record_id`. On refusal returns
    /// the record as it stands.
    fn transition(&self, record_id: Uuid, next: LifecycleState) -> Result<(), TransferRecord> {
        let mut refused = None;
        self.current.send_if_modified(|current| {
            if current.id != record_id {
                refused = Some(current.clone());
                return false;
            }
            let from = current.state;
            match current.transition(next) {
                Ok(()) => {
                    tracing::info!(record_id = %record_id, from = %from, to = %next, "Transfer state changed");
                    self.emit(TransferEvent::StateChanged {
                        record_id,
                        from,
                        to: next,
                    });
                    if next.is_terminal() {
                        metrics::record_terminal(next);
                        tracing::info!(
                            record_id = %record_id,
                            state = %next,
                            tx_hash = ?current.transaction_hash,
                            "Transfer finished"
                        );
                    }
                    true
                }
                Err(e) => {
                    tracing::debug!(record_id = %record_id, error = %e, "Transition refused");
                    refused = Some(current.clone());
                    false
                }
            }
        });
        match refused {
            Some(current) => Err(current),
            None => Ok(()),
        }
    }

    fn fail(&self, record_id: Uuid, message: String) {
        self.current.send_if_modified(|current| {
            let from = current.state;
            if current.id != record_id || current.fail(message.clone()).is_err() {
                return false;
            }
            self.emit(TransferEvent::StateChanged {
                record_id,
                from,
                to: LifecycleState::Error,
            });
            metrics::record_terminal(LifecycleState::Error);
            tracing::warn!(record_id = %record_id, error = %message, "Transfer ended with error");
            true
        });
    }

    fn check(&self, record_id: Uuid, cancel: &CancellationToken, check: &PollCheck) {
        if cancel.is_cancelled() {
            return;
        }
        metrics::record_poll_check(match &check.status {
            Some(BackendStatus::Unrecognized(_)) => "unrecognized",
            Some(status) => status.label(),
            None => "missing",
        });
        self.current.send_if_modified(|current| {
            if current.id != record_id || current.is_terminal() {
                return false;
            }
            current.poll_checks += 1;
            self.emit(TransferEvent::Checked {
                record_id,
                attempt: check.attempt,
                status: check.status.as_ref().map(|s| s.label().to_string()),
            });
            tracing::debug!(record_id = %record_id, attempt = check.attempt, checks = current.poll_checks, "Backend check recorded");
            true
        });
    }
}

/// Orchestrates session, submission and status polling for one token.
pub struct TransferLifecycle {
    config: Arc<TransferConfig>,
    session: WalletSession,
    submitter: TransferSubmitter,
    poller: StatusPoller,
    record: Arc<RecordChannel>,
    session_changes: broadcast::Sender<SessionChange>,
    active_poll: Mutex<Option<ActivePoll>>,
    wallet_events: Mutex<Option<EventSubscription>>,
    submitting: tokio::sync::Mutex<()>,
    teardown: CancellationToken,
}

impl TransferLifecycle {
    /// Build the pipeline. `wallet` is `None` when no wallet is available.
    pub fn new(
        config: Arc<TransferConfig>,
        wallet: Option<Arc<dyn WalletProvider>>,
        status: Arc<dyn StatusSource>,
    ) -> Result<Arc<Self>, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let token: Address = parse_address(&config.token.contract_address).ok_or_else(|| {
            ConfigError::Validation(vec![ValidationError {
                field: "token.contract_address",
                message: "not a valid address".to_string(),
            }])
        })?;

        let session = WalletSession::new(
            wallet,
            NetworkGuard::from_config(&config.network),
            token,
            config.token.default_decimals,
        );
        let poller = StatusPoller::from_config(status, &config.backend);
        let (session_changes, _) = broadcast::channel(16);

        Ok(Arc::new(Self {
            config,
            session,
            submitter: TransferSubmitter::new(token),
            poller,
            record: Arc::new(RecordChannel::new()),
            session_changes,
            active_poll: Mutex::new(None),
            wallet_events: Mutex::new(None),
            submitting: tokio::sync::Mutex::new(()),
            teardown: CancellationToken::new(),
        }))
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Observe the latest record. Intermediate values may be skipped by a
    /// slow observer; use [`events`](Self::events) for the full history.
    pub fn subscribe(&self) -> watch::Receiver<TransferRecord> {
        self.record.current.subscribe()
    }

    /// Every record step from now on, in order.
    pub fn events(&self) -> broadcast::Receiver<TransferEvent> {
        self.record.events.subscribe()
    }

    pub fn record(&self) -> TransferRecord {
        self.record.snapshot()
    }

    pub fn state(&self) -> LifecycleState {
        self.record.current.borrow().state
    }

    /// Session changes caused by wallet notifications.
    pub fn session_changes(&self) -> broadcast::Receiver<SessionChange> {
        self.session_changes.subscribe()
    }

    pub fn session(&self) -> Arc<Session> {
        self.session.current()
    }

    pub fn token_meta(&self) -> TokenMeta {
        self.session.token_meta()
    }

    /// Connect the wallet and register for its notifications.
    pub async fn connect(self: &Arc<Self>) -> Result<Connected, ConnectionError> {
        let connected = self.session.connect().await?;
        if let Some(warning) = &connected.warning {
            tracing::warn!(warning = %warning, "Connected with degraded token metadata");
        }
        self.watch_wallet();
        Ok(connected)
    }

    /// Register the notification listener once per lifecycle.
    fn watch_wallet(self: &Arc<Self>) {
        let Some(provider) = self.session.provider() else {
            return;
        };

        let mut slot = lock(&self.wallet_events);
        if slot.as_ref().is_some_and(|s| s.is_active()) {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        *slot = Some(EventSubscription::spawn(provider.subscribe(), move |event| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(lifecycle) if !lifecycle.teardown.is_cancelled() => {
                        lifecycle.on_wallet_event(event).await;
                        true
                    }
                    _ => false,
                }
            }
        }));
    }

    /// Apply a wallet notification. Runs to completion before the next one.
    ///
    /// On a network change the active record is ended under the session's
    /// connection lock, after the session has been cleared.
    pub async fn on_wallet_event(&self, event: WalletEvent) {
        let change = self
            .session
            .handle_event_with(event, || self.abandon_active(NETWORK_CHANGED_MESSAGE))
            .await;
        tracing::info!(change = %change.message(), "Wallet session changed");
        let _ = self.session_changes.send(change);
    }

    /// Validate, sign, wait for inclusion and start backend polling.
    ///
    /// Returns once the transfer is `pending`; follow the rest through
    /// [`events`](Self::events) or [`subscribe`](Self::subscribe).
    pub async fn submit(&self, request: TransferRequest) -> Result<TxHash, TransferError> {
        let _submitting = self.submitting.try_lock().map_err(|_| TransferError::Busy)?;
        if self.teardown.is_cancelled() {
            return Err(TransferError::Interrupted("lifecycle shut down".to_string()));
        }

        let current = self.record();
        if current.state != LifecycleState::Idle && !current.is_terminal() {
            return Err(TransferError::Busy);
        }

        let (session, token) = self.session.snapshot().await;
        let prepared = self.submitter.prepare(&request, &session, &token)?;

        self.cancel_active_poll();

        let record_id = self.record.start();
        self.advance(record_id, LifecycleState::AwaitingWalletConfirmation)?;
        self.ensure_session_current(record_id, &session)?;
        metrics::record_submission();

        let handle = match self.submitter.send(&prepared).await {
            Ok(handle) => handle,
            Err(e) => {
                self.record.fail(record_id, e.to_string());
                return Err(e.into());
            }
        };

        self.record.set_hash(record_id, handle.hash);
        self.advance(record_id, LifecycleState::AwaitingReceipt)?;

        if let Err(e) = handle.wait().await {
            self.record.fail(record_id, e.to_string());
            return Err(e.into());
        }

        self.advance(record_id, LifecycleState::Pending)?;
        self.start_poll(record_id, handle.hash);

        Ok(handle.hash)
    }

    /// Refuse to sign with a session that was replaced after validation.
    ///
    /// A network change that cleared the session before the record existed
    /// could not end it, so it is ended here instead.
    fn ensure_session_current(&self, record_id: Uuid, validated: &Arc<Session>) -> Result<(), TransferError> {
        let current = self.session.current();
        if Arc::ptr_eq(&current, validated) {
            return Ok(());
        }

        let message = if current.network_id == validated.network_id {
            SESSION_CHANGED_MESSAGE
        } else {
            NETWORK_CHANGED_MESSAGE
        };
        tracing::warn!(record_id = %record_id, "Session replaced before signing");
        self.record.fail(record_id, message.to_string());
        Err(TransferError::Interrupted(message.to_string()))
    }

    fn advance(&self, record_id: Uuid, next: LifecycleState) -> Result<(), TransferError> {
        self.record.transition(record_id, next).map_err(|current| {
            let message = current
                .last_error
                .clone()
                .unwrap_or_else(|| format!("record is {}", current.state));
            TransferError::Interrupted(message)
        })
    }

    fn start_poll(&self, record_id: Uuid, tx_hash: TxHash) {
        let cancel = self.teardown.child_token();
        let poller = self.poller.clone();
        let record = self.record.clone();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let hash = tx_hash.to_string();
            let outcome = poller
                .poll(&hash, &token, |check| record.check(record_id, &token, check))
                .await;

            let Some(outcome) = outcome else {
                tracing::debug!(tx_hash = %hash, "Status polling cancelled");
                return;
            };
            if token.is_cancelled() {
                return;
            }

            match outcome {
                PollOutcome::Success => {
                    let _ = record.transition(record_id, LifecycleState::Success);
                }
                PollOutcome::Failed => {
                    let _ = record.transition(record_id, LifecycleState::Failed);
                }
                PollOutcome::Error(e) => record.fail(record_id, e.to_string()),
            }
        });

        *lock(&self.active_poll) = Some(ActivePoll {
            record_id,
            cancel,
            handle,
        });
    }

    fn cancel_active_poll(&self) {
        if let Some(active) = lock(&self.active_poll).take() {
            active.cancel.cancel();
            if !active.handle.is_finished() {
                tracing::debug!(record_id = %active.record_id, "Cancelled previous status poll");
            }
        }
    }

    /// Stop tracking the active transfer and end it with `error`.
    fn abandon_active(&self, message: &str) {
        self.cancel_active_poll();
        let record_id = self.record.current.borrow().id;
        self.record.fail(record_id, message.to_string());
    }

    /// Tear down: stop polling and deregister wallet notifications.
    pub fn shutdown(&self) {
        self.teardown.cancel();
        self.cancel_active_poll();
        lock(&self.wallet_events).take();
        tracing::info!("Transfer lifecycle shut down");
    }

    /// Whether a status poll task is still running.
    pub fn is_polling(&self) -> bool {
        lock(&self.active_poll)
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }
}

impl Drop for TransferLifecycle {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
