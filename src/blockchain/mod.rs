//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! user input (recipient, amount)
//!     → address.rs (0x-prefixed, checksum-aware parsing)
//!     → units.rs (decimal string → base units, no floating point)
//! wallet chain id
//!     → network.rs (compare against the expected network)
//! Environment Variables (private key, RPC URL)
//!     → wallet.rs (local signer over an alloy provider)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod address;
pub mod network;
pub mod types;
pub mod units;
pub mod wallet;

pub use address::{is_address, parse_address};
pub use network::{NetworkGuard, NetworkMismatch};
pub use types::ChainId;
pub use units::{format_units, parse_units, AmountError};
pub use wallet::LocalWallet;
