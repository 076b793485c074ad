//! Status backend client.
//!
//! # Responsibilities
//! - Issue `GET {base_url}/tx_status/{hash}`
//! - Separate transport failures, non-2xx answers and malformed bodies
//! - Enforce a per-request timeout

use async_trait::async_trait;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::status::types::{StatusEnvelope, StatusFetchError};

/// Source of backend status envelopes.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, tx_hash: &str) -> Result<StatusEnvelope, StatusFetchError>;
}

/// HTTP implementation backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpStatusClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, StatusFetchError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| StatusFetchError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, StatusFetchError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn status_url(&self, tx_hash: &str) -> String {
        format!("{}/tx_status/{}", self.base_url, tx_hash)
    }
}

#[async_trait]
impl StatusSource for HttpStatusClient {
    async fn fetch_status(&self, tx_hash: &str) -> Result<StatusEnvelope, StatusFetchError> {
        let url = self.status_url(tx_hash);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StatusFetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = %status, "Status backend returned non-success");
            return Err(StatusFetchError::HttpStatus(status.as_u16()));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| StatusFetchError::Transport(e.to_string()))?;

        serde_json::from_str::<StatusEnvelope>(&text).map_err(|e| StatusFetchError::Parse(e.to_string()))
    }
}
