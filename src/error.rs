//! Error types for bookie-storage
//!
//! Provides a unified error type for the channel, the write cache and the
//! entry log flush path.

use thiserror::Error;

/// Result type alias using StorageError
pub type Result<T> = std::result::Result<T, StorageError>;

/// Unified error type for bookie-storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is closed")]
    Closed(&'static str),

    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Memory Errors
    // -------------------------------------------------------------------------
    #[error("Allocation of {requested} bytes failed")]
    AllocationFailed { requested: usize },

    // -------------------------------------------------------------------------
    // Entry Log Errors
    // -------------------------------------------------------------------------
    #[error("Entry log corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Shorthand for the read-past-end condition reported by channel reads
    pub(crate) fn read_past_end(position: u64, length: usize, end: u64) -> Self {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "read past end of data: position {} + length {} > end {}",
                position, length, end
            ),
        ))
    }

    /// True if this is an I/O failure (including reads past the end of data)
    pub fn is_io(&self) -> bool {
        matches!(self, StorageError::Io(_))
    }

    /// True if this is an argument rejection
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, StorageError::InvalidArgument(_))
    }
}
