//! Log store and channel trait definitions.

use crate::error::StorageResult;
use std::fmt;

/// The two kinds of log maintained by the engine.
///
/// Transaction logs hold the entry stream; checkpoint logs hold
/// checkpoint records pointing back into the transaction logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// The transaction entry log.
    Transaction,
    /// The checkpoint log.
    Checkpoint,
}

impl LogKind {
    /// File name prefix used by directory-backed stores.
    #[must_use]
    pub const fn file_prefix(self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::Checkpoint => "checkpoint",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_prefix())
    }
}

/// A collection of numbered log files of both kinds.
///
/// Stores are **opaque byte stores**. They answer which versions exist,
/// how large each one is, and hand out byte channels. They do not
/// understand headers, entries, or checkpoint records - the core crate
/// owns all format interpretation.
///
/// # Invariants
///
/// - `versions` returns existing versions in ascending order
/// - `size` and `open` fail with [`crate::StorageError::VersionNotFound`]
///   for versions that do not exist
/// - `create` makes an empty channel and registers the version
pub trait LogStore: Send + Sync {
    /// Returns all existing versions of the given kind, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing directory cannot be listed.
    fn versions(&self, kind: LogKind) -> StorageResult<Vec<u64>>;

    /// Returns whether the given version exists, without opening it.
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    fn contains(&self, kind: LogKind, version: u64) -> StorageResult<bool>;

    /// Returns the size in bytes of the given version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version does not exist or its metadata
    /// cannot be read.
    fn size(&self, kind: LogKind, version: u64) -> StorageResult<u64>;

    /// Opens a byte channel over an existing version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version does not exist or cannot be opened.
    fn open(&self, kind: LogKind, version: u64) -> StorageResult<Box<dyn LogChannel>>;

    /// Creates a new, empty version and returns a channel over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be created.
    fn create(&self, kind: LogKind, version: u64) -> StorageResult<Box<dyn LogChannel>>;
}

/// A byte channel over a single log file version.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `flush` ensures all appended data is durable
pub trait LogChannel: Send {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if the range extends
    /// beyond the current size, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the channel.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Flushes all pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the channel in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Truncates the channel to the given size.
    ///
    /// Used by best-effort recovery to cut a corrupt tail, and by tests
    /// to simulate torn writes.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_size` is greater than the current size
    /// or the truncation fails.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
