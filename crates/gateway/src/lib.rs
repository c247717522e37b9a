//! Gateway access for Canopy.
//!
//! This crate provides:
//! - A registry of read, trusted-read and write endpoints with failure cooldowns
//! - A bounded retry policy with exponential backoff
//! - The HTTP block transport (`/api/v0/block/get`, `/api/v0/block/put`)
//! - The chunked store that puts and gets whole payloads

pub mod error;
pub mod registry;
pub mod retry;
pub mod store;
pub mod transport;

pub use error::{GatewayError, GatewayResult};
pub use registry::{EndpointStatus, GatewayRegistry, GatewayRole};
pub use retry::RetryPolicy;
pub use store::{ChunkedStore, PutResult};
pub use transport::{BlockTransport, HttpTransport, PutResponse};
