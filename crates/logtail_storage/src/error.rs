//! Error types for storage operations.

use crate::store::LogKind;
use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The requested log file version does not exist.
    #[error("{kind} log version {version} does not exist")]
    VersionNotFound {
        /// The log kind that was requested.
        kind: LogKind,
        /// The version that was requested.
        version: u64,
    },

    /// Attempted to read beyond the end of a channel.
    #[error("read beyond end of channel: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current channel size.
        size: u64,
    },

    /// The store directory is missing or not usable.
    #[error("invalid store directory: {0}")]
    InvalidDirectory(String),
}

impl StorageError {
    /// Returns true if this error means a byte range was not available,
    /// as opposed to the underlying device failing.
    #[must_use]
    pub fn is_read_past_end(&self) -> bool {
        matches!(self, Self::ReadPastEnd { .. })
    }
}
