//! Wallet capability and session handling.
//!
//! # Data Flow
//! ```text
//! WalletProvider (local key, or a test double)
//!     → session.rs (account access → network guard → decimals)
//!     → events.rs (account / network notifications → session.rs)
//! ```

pub mod events;
pub mod provider;
pub mod session;

pub use events::EventSubscription;
pub use provider::{TransferReceipt, WalletError, WalletEvent, WalletProvider};
pub use session::{Connected, ConnectionError, Session, SessionChange, TokenMeta, WalletSession};
