//! Structured logging.
//!
//! The subscriber is initialised once by the binary. Library code only emits
//! `tracing` events and never installs a subscriber itself.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("token_transfer={}", level)
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `level`. Calling this twice is harmless; the second
/// call is ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
