//! Client configuration
//!
//! A single host string (`host:port`) combined with a fixed scheme and API
//! prefix. There is no configuration file and no environment lookup.

use crate::errors::{ClientError, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1:8080";

/// Scheme used for every request
pub const SCHEME: &str = "http";

/// Path prefix shared by all endpoints
pub const API_PREFIX: &str = "/api";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address as `host:port`
    pub host: String,

    /// Transport-level timeout in milliseconds; `None` keeps the transport default
    pub timeout_ms: Option<u64>,
}

impl ClientConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Base URL for all endpoints, e.g. `http://127.0.0.1:8080/api/`
    ///
    /// The trailing slash lets endpoint segments be joined onto the prefix.
    pub fn base_url(&self) -> Result<Url> {
        base_url(&self.host)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: DEFAULT_HOST.to_string(),
            timeout_ms: None,
        }
    }
}

/// Build the base URL for a `host:port` string
pub fn base_url(host: &str) -> Result<Url> {
    let invalid = |reason: String| ClientError::InvalidHost {
        host: host.to_string(),
        reason,
    };

    if host.trim().is_empty() || host.contains('/') {
        return Err(invalid("expected host:port".to_string()));
    }

    let url = Url::parse(&format!("{}://{}{}/", SCHEME, host, API_PREFIX))
        .map_err(|e| invalid(e.to_string()))?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok(url)
}
