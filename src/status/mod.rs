//! Backend transaction status.
//!
//! # Data Flow
//! ```text
//! tx hash
//!     → client.rs (GET /tx_status/{hash})
//!     → types.rs (envelope → BackendStatus)
//!     → poller.rs (immediate check, then fixed interval until terminal)
//! ```

pub mod client;
pub mod poller;
pub mod types;

pub use client::{HttpStatusClient, StatusSource};
pub use poller::{PollCheck, StatusPoller};
pub use types::{BackendStatus, PollError, PollOutcome, StatusEnvelope, StatusFetchError};
