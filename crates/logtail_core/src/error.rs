//! Error types for tail recovery.

use crate::types::LogPosition;
use std::io;
use thiserror::Error;

/// Result type for tail recovery operations.
pub type TailResult<T> = Result<T, TailError>;

/// Errors that can occur while determining the log tail.
///
/// The variants fall into four classes with different propagation rules:
///
/// - [`Storage`](Self::Storage), [`Io`](Self::Io) and
///   [`InvalidHeader`](Self::InvalidHeader) mean the underlying files
///   could not be read at all. They always escalate - an unreadable file
///   may be a permissions or disk problem that no fallback can fix.
/// - [`EntryCorruption`](Self::EntryCorruption) means bytes were readable
///   but wrong. Whether it escalates is gated by
///   `fail_on_corrupted_log_files`.
/// - [`ReaderPositionMismatch`](Self::ReaderPositionMismatch) signals a
///   caller bug and always escalates.
/// - [`RecoveryBlocked`](Self::RecoveryBlocked) is the terminal,
///   user-visible refusal to recover.
#[derive(Debug, Error)]
pub enum TailError {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] logtail_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A log file header could not be decoded.
    #[error("invalid log header in version {version}: {message}")]
    InvalidHeader {
        /// The log version whose header is malformed.
        version: u64,
        /// Description of the problem.
        message: String,
    },

    /// A readable region of a log file contained malformed bytes.
    #[error("corrupted log entry in log version {version}: {message}")]
    EntryCorruption {
        /// The log version containing the corruption.
        version: u64,
        /// Description of the corruption.
        message: String,
    },

    /// The entry reader landed on a position for the wrong log version.
    #[error(
        "expected log positions only for log file with version {expected_version} \
         but encountered {position} while reading the {log_name} log"
    )]
    ReaderPositionMismatch {
        /// The version being read.
        expected_version: u64,
        /// The position the reader reported.
        position: LogPosition,
        /// The log the position belongs to.
        log_name: &'static str,
    },

    /// Recovery was refused because the logs are inconsistent.
    #[error(
        "error reading transaction logs, recovery not possible: {detail}. To force the \
         database to start anyway, set `fail_on_corrupted_log_files = false`. This will \
         recover as much as possible and then truncate the corrupt part of the \
         transaction log. Store consistency is then no longer guaranteed; consider \
         restoring from a consistent backup instead"
    )]
    RecoveryBlocked {
        /// What blocked recovery.
        detail: String,
        /// The underlying error, when one triggered the refusal.
        #[source]
        source: Option<Box<TailError>>,
    },
}

impl TailError {
    /// Creates an invalid header error.
    pub fn invalid_header(version: u64, message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            version,
            message: message.into(),
        }
    }

    /// Creates an entry corruption error.
    pub fn entry_corruption(version: u64, message: impl Into<String>) -> Self {
        Self::EntryCorruption {
            version,
            message: message.into(),
        }
    }

    /// Escalates an underlying error into a fatal recovery refusal.
    pub fn recovery_blocked(source: TailError) -> Self {
        Self::RecoveryBlocked {
            detail: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a fatal recovery refusal without an underlying error.
    pub fn recovery_blocked_message(detail: impl Into<String>) -> Self {
        Self::RecoveryBlocked {
            detail: detail.into(),
            source: None,
        }
    }

    /// Returns true if this error is policy-gated corruption rather than
    /// an I/O failure.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::EntryCorruption { .. })
    }
}
