//! Resolver and connection configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::cdp::CDPError;
use crate::wait::WaitConfig;

/// How long element resolution waits for a query to produce matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            poll_interval_ms: 100,
        }
    }
}

impl ResolverConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            poll_interval_ms: poll_interval.as_millis() as u64,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig::new(self.timeout(), self.poll_interval())
    }
}

/// CDP connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CdpConfig {
    pub id: String,
    pub endpoint: String,
    pub request_timeout_ms: u64,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            endpoint: "ws://localhost:9222".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl CdpConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Parse the endpoint; only `ws://` and `wss://` are accepted
    pub fn validated_endpoint(&self) -> Result<Url, CDPError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| CDPError::InvalidEndpoint(self.endpoint.clone(), e.to_string()))?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(CDPError::InvalidEndpoint(
                self.endpoint.clone(),
                format!("unsupported scheme '{}'", other),
            )),
        }
    }
}
