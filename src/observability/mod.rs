//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! wallet / status / transfer produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters via the metrics facade)
//!
//! Consumers:
//!     → stderr (fmt layer, filtered by RUST_LOG or the configured level)
//!     → whatever recorder the embedding application installs
//! ```

pub mod logging;
pub mod metrics;
