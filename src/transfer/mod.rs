//! Token transfer lifecycle.

pub mod lifecycle;
pub mod state;
pub mod submitter;

pub use lifecycle::{TransferLifecycle, NETWORK_CHANGED_MESSAGE, SESSION_CHANGED_MESSAGE};
pub use state::{LifecycleState, TransferEvent, TransferRecord};
pub use submitter::{SubmissionError, TransferError, TransferRequest, TransferSubmitter, ValidationError};
