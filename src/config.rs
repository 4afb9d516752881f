//! Environment-based configuration.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::errors::{ServiceError, ServiceResult};

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// Upper bound on concurrently transcoded items within one batch request.
    pub max_concurrent_items: usize,
    /// Client-side request timeout.
    pub request_timeout: Duration,
    /// Base URL of the remote optimize service used by the batched client variant.
    pub remote_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 3000).into(),
            max_body_bytes: 50 * 1024 * 1024, // 50MB
            max_concurrent_items: 4,
            request_timeout: Duration::from_secs(120),
            remote_base_url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

impl Config {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> ServiceResult<Self> {
        let defaults = Config::default();

        let bind_addr = match env::var("OPTIPRESS_BIND_ADDR") {
            Ok(raw) => raw.parse::<SocketAddr>().map_err(|e| {
                ServiceError::Configuration(format!("Invalid OPTIPRESS_BIND_ADDR '{}': {}", raw, e))
            })?,
            Err(_) => defaults.bind_addr,
        };

        let max_body_bytes = env::var("OPTIPRESS_MAX_BODY_BYTES")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(defaults.max_body_bytes);

        let max_concurrent_items = env::var("OPTIPRESS_MAX_CONCURRENT_ITEMS")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_concurrent_items);

        let request_timeout = env::var("OPTIPRESS_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let remote_base_url = env::var("OPTIPRESS_REMOTE_BASE_URL")
            .unwrap_or(defaults.remote_base_url);

        Ok(Self {
            bind_addr,
            max_body_bytes,
            max_concurrent_items,
            request_timeout,
            remote_base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_concurrent_items, 4);
        assert_eq!(config.max_body_bytes, 50 * 1024 * 1024);
        assert_eq!(config.bind_addr.port(), 3000);
    }
}
