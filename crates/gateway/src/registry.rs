//! Gateway endpoints and failure cooldowns.
//!
//! Every endpoint remembers when it last failed. Selection skips endpoints
//! whose last failure is inside the cooldown window and picks uniformly at
//! random among the rest, so traffic spreads across healthy gateways and a
//! failed gateway rejoins the pool once the window has passed.

use crate::error::{GatewayError, GatewayResult};
use canopy_core::{GatewayConfig, Multihash};
use rand::seq::IndexedRandom;
use reqwest::Url;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use time::OffsetDateTime;

/// What an endpoint is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GatewayRole {
    /// Block reads via `/api/v0/block/get`.
    Read,
    /// User-facing `/ipfs/<address>` links.
    TrustedRead,
    /// Block writes via `/api/v0/block/put`.
    Write,
}

impl fmt::Display for GatewayRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::TrustedRead => "trusted read",
            Self::Write => "write",
        })
    }
}

struct Endpoint {
    url: String,
    last_error: Mutex<Option<OffsetDateTime>>,
}

impl Endpoint {
    fn last_error(&self) -> Option<OffsetDateTime> {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_last_error(&self, at: OffsetDateTime) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(at);
    }
}

/// Snapshot of one endpoint for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointStatus {
    pub url: String,
    pub last_error: Option<OffsetDateTime>,
    pub active: bool,
}

/// Endpoint sets per role with shared failure state.
///
/// Share it behind an `Arc`; all methods take `&self`.
pub struct GatewayRegistry {
    read: Vec<Endpoint>,
    trusted_read: Vec<Endpoint>,
    write: Vec<Endpoint>,
    cooldown: Duration,
}

impl GatewayRegistry {
    /// Build a registry from endpoint base URLs.
    pub fn new(
        read: &[String],
        trusted_read: &[String],
        write: &[String],
        cooldown: Duration,
    ) -> GatewayResult<Self> {
        Ok(Self {
            read: build_endpoints(read)?,
            trusted_read: build_endpoints(trusted_read)?,
            write: build_endpoints(write)?,
            cooldown,
        })
    }

    /// Build a registry from configuration.
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        Self::new(
            &config.read_endpoints,
            &config.trusted_read_endpoints,
            &config.write_endpoints,
            config.cooldown(),
        )
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn role(&self, role: GatewayRole) -> &[Endpoint] {
        match role {
            GatewayRole::Read => &self.read,
            GatewayRole::TrustedRead => &self.trusted_read,
            GatewayRole::Write => &self.write,
        }
    }

    fn is_active(&self, endpoint: &Endpoint, now: OffsetDateTime) -> bool {
        match endpoint.last_error() {
            None => true,
            Some(at) => {
                let cooldown =
                    time::Duration::try_from(self.cooldown).unwrap_or(time::Duration::MAX);
                now - at > cooldown
            }
        }
    }

    /// Pick a random endpoint for `role` outside its cooldown window.
    pub fn select(&self, role: GatewayRole) -> GatewayResult<String> {
        let now = OffsetDateTime::now_utc();
        let active: Vec<&Endpoint> = self
            .role(role)
            .iter()
            .filter(|endpoint| self.is_active(endpoint, now))
            .collect();

        active
            .choose(&mut rand::rng())
            .map(|endpoint| endpoint.url.clone())
            .ok_or(GatewayError::NoActiveEndpoints { role })
    }

    /// Record a failure of `url` now.
    pub fn mark_failure(&self, role: GatewayRole, url: &str) {
        self.mark_failure_at(role, url, OffsetDateTime::now_utc());
    }

    /// Record a failure of `url` at a given time.
    pub fn mark_failure_at(&self, role: GatewayRole, url: &str, at: OffsetDateTime) {
        let url = url.trim_end_matches('/');
        match self.role(role).iter().find(|endpoint| endpoint.url == url) {
            Some(endpoint) => {
                endpoint.set_last_error(at);
                tracing::debug!(%role, endpoint = %url, "Endpoint placed in cooldown");
            }
            None => {
                tracing::warn!(%role, endpoint = %url, "Failure reported for unknown endpoint");
            }
        }
    }

    /// Current state of every endpoint in `role`.
    pub fn endpoints(&self, role: GatewayRole) -> Vec<EndpointStatus> {
        let now = OffsetDateTime::now_utc();
        self.role(role)
            .iter()
            .map(|endpoint| EndpointStatus {
                url: endpoint.url.clone(),
                last_error: endpoint.last_error(),
                active: self.is_active(endpoint, now),
            })
            .collect()
    }

    /// A user-facing URL for `address` on a trusted gateway.
    pub fn trusted_url(&self, address: &Multihash) -> GatewayResult<String> {
        let base = self.select(GatewayRole::TrustedRead)?;
        Ok(format!("{base}/ipfs/{address}"))
    }
}

fn build_endpoints(urls: &[String]) -> GatewayResult<Vec<Endpoint>> {
    urls.iter()
        .map(|raw| {
            let url = raw.trim_end_matches('/');
            let parsed =
                Url::parse(url).map_err(|e| GatewayError::InvalidEndpoint(format!("{raw}: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(GatewayError::InvalidEndpoint(format!(
                    "{raw}: unsupported scheme {}",
                    parsed.scheme()
                )));
            }
            Ok(Endpoint {
                url: url.to_string(),
                last_error: Mutex::new(None),
            })
        })
        .collect()
}
