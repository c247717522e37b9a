//! Gateway error types.

use crate::registry::GatewayRole;
use thiserror::Error;

/// Errors from gateway selection, transport and block assembly.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Codec(#[from] canopy_core::Error),

    #[error("no active {role} endpoints; possible connectivity problem")]
    NoActiveEndpoints { role: GatewayRole },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl GatewayError {
    /// Whether another endpoint might succeed where this one failed.
    ///
    /// Codec and verification failures describe the content itself and are
    /// never retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::InvalidResponse(_)
        )
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
