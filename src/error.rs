//! Error types for seqset
//!
//! Provides a unified error type for all operations.
//!
//! A lookup miss is not an error: index and engine lookups return
//! `Ok(None)`, leaving `Format` for malformed input and `Io` for I/O failure.

use thiserror::Error;

/// Result type alias using SeqSetError
pub type Result<T> = std::result::Result<T, SeqSetError>;

/// Unified error type for seqset operations
#[derive(Debug, Error)]
pub enum SeqSetError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Format Errors (length indicators, RBNs, index lines, record widths)
    // -------------------------------------------------------------------------
    #[error("Format error: {0}")]
    Format(String),

    #[error("Offset {offset} is out of range for a file of {len} bytes")]
    OffsetOutOfRange { offset: u64, len: u64 },

    // -------------------------------------------------------------------------
    // Descriptor Errors
    // -------------------------------------------------------------------------
    #[error("Descriptor error: {0}")]
    Descriptor(String),

    // -------------------------------------------------------------------------
    // Block Chain Errors
    // -------------------------------------------------------------------------
    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for SeqSetError {
    fn from(e: bincode::Error) -> Self {
        SeqSetError::Serialization(e.to_string())
    }
}
