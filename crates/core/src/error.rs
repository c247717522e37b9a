//! Error types for the wire formats.

use thiserror::Error;

/// Core codec error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("buffer overrun: {0}")]
    BufferOverrun(String),

    #[error("varint exceeds 64 bits at offset {offset}")]
    VarintOverflow { offset: usize },

    #[error("unknown field: tag {0}")]
    UnknownField(u64),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("unsupported hash: {0}")]
    UnsupportedHash(String),

    #[error("format violation: {0}")]
    FormatViolation(String),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
