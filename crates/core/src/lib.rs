//! Wire formats for the Canopy block client.
//!
//! This crate defines everything that can be computed without a network:
//! - Base-128 varints and a flat protobuf subset
//! - dag-pb nodes, links and UnixFS file records
//! - SHA2-256 multihash addresses and integrity checks
//! - Chunking and offline block layout
//! - Gateway configuration

pub mod chunk;
pub mod config;
pub mod dag;
pub mod error;
pub mod multihash;
pub mod protobuf;
pub mod unixfs;
pub mod varint;

pub use chunk::{Block, DagLayout, chunk_ranges};
pub use config::{GatewayConfig, RetryConfig};
pub use dag::{DagRecord, Link, encode_node, parse_node};
pub use error::{Error, Result};
pub use multihash::Multihash;

/// Default chunk size: 256 KiB
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Default limit on concurrent block requests per fan-out.
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;
