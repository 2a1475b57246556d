//! Core type definitions for tail recovery.

use std::fmt;

/// An exact byte address within a specific numbered log file.
///
/// Positions order by log version first, then byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition {
    log_version: u64,
    byte_offset: u64,
}

impl LogPosition {
    /// Creates a position.
    #[must_use]
    pub const fn new(log_version: u64, byte_offset: u64) -> Self {
        Self {
            log_version,
            byte_offset,
        }
    }

    /// The log file version this position points into.
    #[must_use]
    pub const fn log_version(self) -> u64 {
        self.log_version
    }

    /// The byte offset within that log file.
    #[must_use]
    pub const fn byte_offset(self) -> u64 {
        self.byte_offset
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}@{}", self.log_version, self.byte_offset)
    }
}

/// Unique identifier for a transaction.
///
/// Transaction IDs are monotonically increasing and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// The kernel format version a log entry was written under.
///
/// Recovery must replay entries with the semantics of the version that
/// wrote them, so the tail scan reports the version byte of the first
/// entry it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KernelVersion(pub u8);

impl KernelVersion {
    /// The first released kernel format.
    pub const V1: Self = Self(1);
    /// Kernel format with chunked transactions.
    pub const V2: Self = Self(2);
    /// The newest kernel format this build writes.
    pub const LATEST: Self = Self::V2;

    /// Creates a kernel version from its wire byte.
    #[must_use]
    pub const fn new(version: u8) -> Self {
        Self(version)
    }

    /// Returns the wire byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self.0
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kernel:{}", self.0)
    }
}
