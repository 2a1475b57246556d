//! Versioned log file collection.

use crate::error::{TailError, TailResult};
use crate::header::{LogHeader, LOG_HEADER_SIZE};
use logtail_storage::{LogChannel, LogKind, LogStore, StorageError};
use std::sync::Arc;

/// One kind of log viewed as a collection of numbered files.
///
/// Answers which versions exist and hands out headers and channels.
/// Version discovery comes from the store's naming scheme; no file is
/// opened to answer an existence question.
#[derive(Clone)]
pub struct LogFile {
    store: Arc<dyn LogStore>,
    kind: LogKind,
}

impl LogFile {
    /// Creates a view over one log kind.
    #[must_use]
    pub fn new(store: Arc<dyn LogStore>, kind: LogKind) -> Self {
        Self { store, kind }
    }

    /// The log kind this view covers.
    #[must_use]
    pub fn kind(&self) -> LogKind {
        self.kind
    }

    /// All existing versions, ascending.
    pub fn versions(&self) -> TailResult<Vec<u64>> {
        Ok(self.store.versions(self.kind)?)
    }

    /// The highest existing version, or `None` if no file exists.
    pub fn highest_log_version(&self) -> TailResult<Option<u64>> {
        Ok(self.store.versions(self.kind)?.last().copied())
    }

    /// The lowest existing version, or `None` if unknown (no file
    /// exists). The `None` is propagated verbatim into the tail
    /// metadata; it is never resolved speculatively.
    pub fn lowest_log_version(&self) -> TailResult<Option<u64>> {
        Ok(self.store.versions(self.kind)?.first().copied())
    }

    /// Whether the given version exists. Does not open the file.
    pub fn version_exists(&self, version: u64) -> TailResult<bool> {
        Ok(self.store.contains(self.kind, version)?)
    }

    /// The on-disk size of the given version.
    pub fn size_of_version(&self, version: u64) -> TailResult<u64> {
        Ok(self.store.size(self.kind, version)?)
    }

    /// Reads and decodes the header of the given version.
    ///
    /// # Errors
    ///
    /// Fails with [`TailError::InvalidHeader`] if the file is shorter
    /// than a header block or the block is malformed, and with a storage
    /// error if the file cannot be read at all.
    pub fn extract_header(&self, version: u64) -> TailResult<LogHeader> {
        let channel = self.open_for_version(version)?;
        let bytes = channel
            .read_at(0, LOG_HEADER_SIZE as usize)
            .map_err(|err| match err {
                StorageError::ReadPastEnd { size, .. } => TailError::invalid_header(
                    version,
                    format!("file holds {size} bytes, shorter than a header block"),
                ),
                other => TailError::Storage(other),
            })?;
        LogHeader::decode(version, &bytes)
    }

    /// Opens a channel over an existing version.
    pub fn open_for_version(&self, version: u64) -> TailResult<Box<dyn LogChannel>> {
        Ok(self.store.open(self.kind, version)?)
    }

    /// Creates a new empty version. Used by the write path.
    pub fn create_version(&self, version: u64) -> TailResult<Box<dyn LogChannel>> {
        Ok(self.store.create(self.kind, version)?)
    }
}

impl std::fmt::Debug for LogFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFile")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store_id::StoreId;
    use logtail_storage::MemoryStore;

    fn transaction_log(store: &Arc<MemoryStore>) -> LogFile {
        LogFile::new(Arc::clone(store) as Arc<dyn LogStore>, LogKind::Transaction)
    }

    #[test]
    fn empty_collection_has_no_versions() {
        let store = Arc::new(MemoryStore::new());
        let log = transaction_log(&store);

        assert_eq!(log.highest_log_version().unwrap(), None);
        assert_eq!(log.lowest_log_version().unwrap(), None);
        assert!(!log.version_exists(0).unwrap());
    }

    #[test]
    fn version_range() {
        let store = Arc::new(MemoryStore::new());
        store.create(LogKind::Transaction, 2).unwrap();
        store.create(LogKind::Transaction, 5).unwrap();
        store.create(LogKind::Checkpoint, 9).unwrap();

        let log = transaction_log(&store);
        assert_eq!(log.lowest_log_version().unwrap(), Some(2));
        assert_eq!(log.highest_log_version().unwrap(), Some(5));
        assert!(log.version_exists(5).unwrap());
        assert!(!log.version_exists(9).unwrap());
    }

    #[test]
    fn extract_header_roundtrip() {
        let store = Arc::new(MemoryStore::new());
        let log = transaction_log(&store);

        let header = LogHeader::new(4, Some(StoreId::random()));
        let mut channel = log.create_version(4).unwrap();
        channel.append(&header.encode()).unwrap();

        assert_eq!(log.extract_header(4).unwrap(), header);
    }

    #[test]
    fn extract_header_of_short_file_fails() {
        let store = Arc::new(MemoryStore::new());
        let log = transaction_log(&store);

        let mut channel = log.create_version(0).unwrap();
        channel.append(b"tiny").unwrap();

        assert!(matches!(
            log.extract_header(0),
            Err(TailError::InvalidHeader { version: 0, .. })
        ));
    }

    #[test]
    fn open_missing_version_fails() {
        let store = Arc::new(MemoryStore::new());
        let log = transaction_log(&store);
        assert!(log.open_for_version(3).is_err());
    }
}
