//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::TransferConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const CONTRACT_ADDRESS_ENV_VAR: &str = "TRANSFER_CONTRACT_ADDRESS";
pub const BACKEND_URL_ENV_VAR: &str = "TRANSFER_BACKEND_URL";
pub const EXPECTED_CHAIN_ID_ENV_VAR: &str = "TRANSFER_EXPECTED_CHAIN_ID";
pub const NETWORK_NAME_ENV_VAR: &str = "TRANSFER_NETWORK_NAME";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, message: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, message } => write!(f, "Invalid {}: {}", var, message),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<TransferConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => TransferConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay externally supplied values onto a parsed configuration.
pub fn apply_env_overrides<F>(config: &mut TransferConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(address) = lookup(CONTRACT_ADDRESS_ENV_VAR) {
        config.token.contract_address = address;
    }
    if let Some(url) = lookup(BACKEND_URL_ENV_VAR) {
        config.backend.base_url = url;
    }
    if let Some(raw) = lookup(EXPECTED_CHAIN_ID_ENV_VAR) {
        config.network.expected_chain_id = raw.trim().parse().map_err(|e| ConfigError::Env {
            var: EXPECTED_CHAIN_ID_ENV_VAR,
            message: format!("'{}' is not a chain id: {}", raw, e),
        })?;
    }
    if let Some(name) = lookup(NETWORK_NAME_ENV_VAR) {
        config.network.display_name = name;
    }
    Ok(())
}
