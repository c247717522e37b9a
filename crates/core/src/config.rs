//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public gateways serving `/api/v0/block/get`.
pub const DEFAULT_READ_ENDPOINTS: &[&str] = &[
    "https://ipfs.infura.io:5001",
    "https://dweb.link",
    "https://gateway.ipfs.io",
];

/// Gateways trusted to serve `/ipfs/<address>` paths directly to users.
pub const DEFAULT_TRUSTED_READ_ENDPOINTS: &[&str] = &[
    "https://ipfs.infura.io",
    "https://gateway.ipfs.io",
    "https://ipfs.io",
];

/// Pinning services accepting `/api/v0/block/put`.
pub const DEFAULT_WRITE_ENDPOINTS: &[&str] = &["https://ipfs.infura.io:5001"];

/// Gateway access configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Endpoints used for block reads.
    #[serde(default = "default_read_endpoints", alias = "readEndpoints")]
    pub read_endpoints: Vec<String>,
    /// Endpoints used when a user-facing URL is needed.
    #[serde(
        default = "default_trusted_read_endpoints",
        alias = "trustedReadEndpoints"
    )]
    pub trusted_read_endpoints: Vec<String>,
    /// Endpoints used for block writes.
    #[serde(default = "default_write_endpoints", alias = "writeEndpoints")]
    pub write_endpoints: Vec<String>,
    /// How long an endpoint is skipped after a failure, in milliseconds.
    #[serde(default = "default_cooldown_ms", alias = "cooldownMs")]
    pub cooldown_ms: u64,
    /// Chunk size in bytes used when storing payloads.
    #[serde(default = "default_chunk_size", alias = "chunkSize")]
    pub chunk_size: usize,
    /// Maximum block requests in flight per fan-out.
    #[serde(default = "default_max_concurrency", alias = "maxConcurrency")]
    pub max_concurrency: usize,
    /// Per-request timeout in seconds.
    #[serde(
        default = "default_request_timeout_secs",
        alias = "requestTimeoutSecs"
    )]
    pub request_timeout_secs: u64,
    /// Retry behaviour for failed block requests.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_read_endpoints() -> Vec<String> {
    DEFAULT_READ_ENDPOINTS.iter().map(|s| s.to_string()).collect()
}

fn default_trusted_read_endpoints() -> Vec<String> {
    DEFAULT_TRUSTED_READ_ENDPOINTS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_write_endpoints() -> Vec<String> {
    DEFAULT_WRITE_ENDPOINTS.iter().map(|s| s.to_string()).collect()
}

fn default_cooldown_ms() -> u64 {
    30 * 60 * 1000 // 30 minutes
}

fn default_chunk_size() -> usize {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_max_concurrency() -> usize {
    crate::DEFAULT_MAX_CONCURRENCY
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            read_endpoints: default_read_endpoints(),
            trusted_read_endpoints: default_trusted_read_endpoints(),
            write_endpoints: default_write_endpoints(),
            cooldown_ms: default_cooldown_ms(),
            chunk_size: default_chunk_size(),
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Cooldown window as a Duration.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> crate::Result<()> {
        if self.chunk_size == 0 {
            return Err(crate::Error::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(crate::Error::InvalidConfig(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::InvalidConfig(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if i64::try_from(self.cooldown_ms).is_err() {
            return Err(crate::Error::InvalidConfig(format!(
                "cooldown_ms {} exceeds maximum value {}",
                self.cooldown_ms,
                i64::MAX
            )));
        }
        self.retry.validate()
    }
}

/// Bounded retry with exponential backoff.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per block, including the first one.
    #[serde(default = "default_max_attempts", alias = "maxAttempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    #[serde(default = "default_initial_backoff_ms", alias = "initialBackoffMs")]
    pub initial_backoff_ms: u64,
    /// Upper bound on the delay between attempts, in milliseconds.
    #[serde(default = "default_max_backoff_ms", alias = "maxBackoffMs")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_attempts == 0 {
            return Err(crate::Error::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(crate::Error::InvalidConfig(format!(
                "retry.initial_backoff_ms {} exceeds retry.max_backoff_ms {}",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}
