//! Transfer metrics.
//!
//! # Metrics
//! - `transfer_submissions_total` (counter): transfers handed to the wallet
//! - `transfer_terminal_total` (counter): terminal outcomes by `state`
//! - `status_poll_checks_total` (counter): backend checks by `outcome`
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed. `set_enabled(false)` silences it entirely.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::transfer::state::LifecycleState;

static ENABLED: AtomicBool = AtomicBool::new(true);

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn record_submission() {
    if is_enabled() {
        metrics::counter!("transfer_submissions_total").increment(1);
    }
}

pub fn record_terminal(state: LifecycleState) {
    if is_enabled() && state.is_terminal() {
        metrics::counter!("transfer_terminal_total", "state" => state.as_str()).increment(1);
    }
}

/// `outcome` is the backend status label, `"unrecognized"` for an unknown
/// label or `"missing"` when the payload had none.
pub fn record_poll_check(outcome: &str) {
    if is_enabled() {
        metrics::counter!("status_poll_checks_total", "outcome" => outcome.to_string()).increment(1);
    }
}
