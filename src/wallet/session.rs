//! Wallet session state and connection handling.
//!
//! # State Transitions
//! ```text
//! Disconnected → Connected: connect() passes account access + network guard
//! Connected → Connected: accounts changed (non-empty) → full reconnect
//! Connected → Disconnected: accounts changed (empty), failed reconnect
//! any → reconnect from scratch: network changed
//! ```
//!
//! # Design Decisions
//! - A `Session` is never mutated; every change stores a replacement
//! - Connection work holds a lock, so readers never observe a half-applied
//!   reconnect
//! - A failed `decimals()` read keeps the last known value

use alloy::primitives::Address;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::blockchain::network::{NetworkGuard, NetworkMismatch};
use crate::blockchain::types::ChainId;
use crate::wallet::provider::{WalletError, WalletEvent, WalletProvider};

/// Errors raised while establishing a session.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    #[error("Wallet is not installed. Install a wallet to use this app.")]
    NotInstalled,

    #[error("Wallet connection rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    NetworkMismatch(#[from] NetworkMismatch),

    #[error("Wallet error: {0}")]
    Provider(String),
}

impl From<WalletError> for ConnectionError {
    fn from(err: WalletError) -> Self {
        if err.user_rejected {
            ConnectionError::Rejected(err.describe().to_string())
        } else {
            ConnectionError::Provider(err.describe().to_string())
        }
    }
}

/// The live wallet connection. Exactly one is current at a time.
#[derive(Clone, Default)]
pub struct Session {
    pub account: Option<Address>,
    pub signer: Option<Arc<dyn WalletProvider>>,
    pub network_id: Option<ChainId>,
}

impl Session {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connected(account: Address, signer: Arc<dyn WalletProvider>, network_id: ChainId) -> Self {
        Self {
            account: Some(account),
            signer: Some(signer),
            network_id: Some(network_id),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some() && self.signer.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("signer", &self.signer.as_ref().map(|_| "<wallet>"))
            .field("network_id", &self.network_id)
            .finish()
    }
}

/// Token metadata read from the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMeta {
    pub decimals: u8,
}

/// Result of a successful `connect()`.
#[derive(Debug, Clone)]
pub struct Connected {
    pub session: Arc<Session>,
    pub token: TokenMeta,
    /// Set when the decimals read failed and the previous value was kept.
    pub warning: Option<String>,
}

/// What a wallet notification did to the session.
#[derive(Debug, Clone)]
pub enum SessionChange {
    /// The session was rebuilt for the new account or network.
    Reconnected(Connected),
    /// Reconnecting failed; the session is now disconnected.
    ReconnectFailed(ConnectionError),
    /// The wallet reported no accounts.
    Disconnected,
}

impl SessionChange {
    /// User-facing description of the change.
    pub fn message(&self) -> String {
        match self {
            SessionChange::Reconnected(connected) => match connected.session.account {
                Some(account) => format!("Wallet connected: {}", account),
                None => "Wallet connected".to_string(),
            },
            SessionChange::ReconnectFailed(err) => err.to_string(),
            SessionChange::Disconnected => "Wallet disconnected. Please connect again.".to_string(),
        }
    }
}

/// Owns the current `Session` and the token metadata.
pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    guard: NetworkGuard,
    token: Address,
    current: ArcSwap<Session>,
    token_meta: ArcSwap<TokenMeta>,
    connecting: Mutex<()>,
}

impl WalletSession {
    /// Create a disconnected session. `provider` is `None` when no wallet is
    /// available in the environment.
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        guard: NetworkGuard,
        token: Address,
        default_decimals: u8,
    ) -> Self {
        Self {
            provider,
            guard,
            token,
            current: ArcSwap::from_pointee(Session::disconnected()),
            token_meta: ArcSwap::from_pointee(TokenMeta {
                decimals: default_decimals,
            }),
            connecting: Mutex::new(()),
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn WalletProvider>> {
        self.provider.as_ref()
    }

    pub fn guard(&self) -> &NetworkGuard {
        &self.guard
    }

    /// Current session without waiting for in-flight connection work.
    pub fn current(&self) -> Arc<Session> {
        self.current.load_full()
    }

    pub fn token_meta(&self) -> TokenMeta {
        **self.token_meta.load()
    }

    /// Session and token metadata once any in-flight connection work has
    /// finished.
    pub async fn snapshot(&self) -> (Arc<Session>, TokenMeta) {
        let _settled = self.connecting.lock().await;
        (self.current(), self.token_meta())
    }

    /// Request account access, verify the network and load token metadata.
    ///
    /// On any failure the session is left disconnected.
    pub async fn connect(&self) -> Result<Connected, ConnectionError> {
        let _connecting = self.connecting.lock().await;
        self.connect_locked().await
    }

    async fn connect_locked(&self) -> Result<Connected, ConnectionError> {
        let session = match self.establish().await {
            Ok(session) => session,
            Err(e) => {
                self.current.store(Arc::new(Session::disconnected()));
                tracing::warn!(error = %e, "Wallet connection failed");
                return Err(e);
            }
        };

        let session = Arc::new(session);
        self.current.store(session.clone());

        let warning = self.refresh_token_meta(&session).await;
        let token = self.token_meta();

        tracing::info!(
            account = ?session.account,
            chain_id = ?session.network_id,
            decimals = token.decimals,
            "Wallet connected"
        );

        Ok(Connected {
            session,
            token,
            warning,
        })
    }

    async fn establish(&self) -> Result<Session, ConnectionError> {
        let provider = self.provider.as_ref().ok_or(ConnectionError::NotInstalled)?;

        let accounts = provider.request_accounts().await?;
        if accounts.is_empty() {
            return Err(ConnectionError::Rejected("no accounts were authorised".to_string()));
        }

        let account = provider.signer_address().await?;
        let chain_id = provider.chain_id().await?;
        self.guard.check(chain_id)?;

        Ok(Session::connected(account, provider.clone(), chain_id))
    }

    async fn refresh_token_meta(&self, session: &Session) -> Option<String> {
        let signer = session.signer.as_ref()?;
        match signer.token_decimals(self.token).await {
            Ok(decimals) => {
                self.token_meta.store(Arc::new(TokenMeta { decimals }));
                None
            }
            Err(e) => {
                let kept = self.token_meta().decimals;
                tracing::warn!(
                    token = %self.token,
                    error = %e,
                    decimals = kept,
                    "Failed to read token decimals, keeping last known value"
                );
                Some(format!("Could not read token decimals ({}); using {}", e, kept))
            }
        }
    }

    /// Drop the current session.
    pub async fn disconnect(&self) {
        let _connecting = self.connecting.lock().await;
        self.current.store(Arc::new(Session::disconnected()));
        tracing::info!("Wallet session cleared");
    }

    /// Apply a wallet notification, producing a replacement session.
    pub async fn handle_event(&self, event: WalletEvent) -> SessionChange {
        self.handle_event_with(event, || {}).await
    }

    /// Like [`handle_event`](Self::handle_event), running `on_network_cleared`
    /// under the connection lock once a network change has cleared the
    /// session and before reconnecting.
    pub async fn handle_event_with<F>(&self, event: WalletEvent, on_network_cleared: F) -> SessionChange
    where
        F: FnOnce() + Send,
    {
        let _connecting = self.connecting.lock().await;

        match event {
            WalletEvent::AccountsChanged(accounts) if accounts.is_empty() => {
                self.current.store(Arc::new(Session::disconnected()));
                tracing::info!("Wallet reported no accounts, session cleared");
                SessionChange::Disconnected
            }
            WalletEvent::AccountsChanged(accounts) => {
                tracing::info!(accounts = accounts.len(), "Wallet accounts changed, reconnecting");
                self.reconnect_locked().await
            }
            WalletEvent::ChainChanged(chain_id) => {
                tracing::warn!(chain_id = %chain_id, "Wallet network changed, reloading session");
                self.current.store(Arc::new(Session::disconnected()));
                on_network_cleared();
                self.reconnect_locked().await
            }
        }
    }

    async fn reconnect_locked(&self) -> SessionChange {
        match self.connect_locked().await {
            Ok(connected) => SessionChange::Reconnected(connected),
            Err(e) => SessionChange::ReconnectFailed(e),
        }
    }
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("installed", &self.provider.is_some())
            .field("expected_chain_id", &self.guard.expected())
            .field("token", &self.token)
            .field("session", &self.current())
            .finish()
    }
}
