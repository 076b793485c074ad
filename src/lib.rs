//! ERC-20 token transfer lifecycle library.
//!
//! Connects a wallet, guards the expected network, submits `transfer`
//! calls and follows each transaction through a status backend until it
//! settles.

pub mod blockchain;
pub mod config;
pub mod observability;
pub mod status;
pub mod transfer;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use config::schema::TransferConfig;
pub use transfer::{LifecycleState, TransferLifecycle, TransferRecord, TransferRequest};
