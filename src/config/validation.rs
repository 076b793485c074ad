//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the token contract address is well formed
//! - Validate value ranges (intervals > 0, URLs parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TransferConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::blockchain::address::is_address;
use crate::config::schema::TransferConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &TransferConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.token.contract_address.is_empty() {
        errors.push(ValidationError::new("token.contract_address", "must be set"));
    } else if !is_address(&config.token.contract_address) {
        errors.push(ValidationError::new(
            "token.contract_address",
            format!("'{}' is not a valid address", config.token.contract_address),
        ));
    }

    if let Err(e) = url::Url::parse(&config.backend.base_url) {
        errors.push(ValidationError::new(
            "backend.base_url",
            format!("invalid URL '{}': {}", config.backend.base_url, e),
        ));
    }

    if let Err(e) = url::Url::parse(&config.network.rpc_url) {
        errors.push(ValidationError::new(
            "network.rpc_url",
            format!("invalid URL '{}': {}", config.network.rpc_url, e),
        ));
    }

    if config.backend.poll_interval_ms == 0 {
        errors.push(ValidationError::new("backend.poll_interval_ms", "must be greater than 0"));
    }

    if config.backend.request_timeout_secs == 0 {
        errors.push(ValidationError::new("backend.request_timeout_secs", "must be greater than 0"));
    }

    if config.backend.max_poll_duration_secs == Some(0) {
        errors.push(ValidationError::new(
            "backend.max_poll_duration_secs",
            "must be greater than 0 when set",
        ));
    }

    if config.network.display_name.trim().is_empty() {
        errors.push(ValidationError::new("network.display_name", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
