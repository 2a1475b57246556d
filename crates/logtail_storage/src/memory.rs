//! In-memory log store for testing.

use crate::error::{StorageError, StorageResult};
use crate::store::{LogChannel, LogKind, LogStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// An in-memory log store.
///
/// This store keeps every log version in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral logs that don't need persistence
///
/// Channels returned by `open` and `create` share the same underlying
/// buffer, so bytes appended through one channel are visible to later
/// reads through another. This mirrors how file-backed channels behave
/// and is what recovery tests rely on.
///
/// # Example
///
/// ```rust
/// use logtail_storage::{LogKind, LogStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// let mut channel = store.create(LogKind::Checkpoint, 3).unwrap();
/// channel.append(b"record").unwrap();
/// assert_eq!(store.versions(LogKind::Checkpoint).unwrap(), vec![3]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<HashMap<(LogKind, u64), Arc<RwLock<Vec<u8>>>>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the raw bytes of a version.
    ///
    /// Useful for assertions in recovery tests.
    #[must_use]
    pub fn raw_bytes(&self, kind: LogKind, version: u64) -> Option<Vec<u8>> {
        self.files
            .read()
            .get(&(kind, version))
            .map(|data| data.read().clone())
    }

    /// Removes a version entirely, simulating a deleted log file.
    pub fn remove(&self, kind: LogKind, version: u64) {
        self.files.write().remove(&(kind, version));
    }

    fn buffer(&self, kind: LogKind, version: u64) -> StorageResult<Arc<RwLock<Vec<u8>>>> {
        self.files
            .read()
            .get(&(kind, version))
            .cloned()
            .ok_or(StorageError::VersionNotFound { kind, version })
    }
}

impl LogStore for MemoryStore {
    fn versions(&self, kind: LogKind) -> StorageResult<Vec<u64>> {
        let mut versions: Vec<u64> = self
            .files
            .read()
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, v)| *v)
            .collect();
        versions.sort_unstable();
        Ok(versions)
    }

    fn contains(&self, kind: LogKind, version: u64) -> StorageResult<bool> {
        Ok(self.files.read().contains_key(&(kind, version)))
    }

    fn size(&self, kind: LogKind, version: u64) -> StorageResult<u64> {
        Ok(self.buffer(kind, version)?.read().len() as u64)
    }

    fn open(&self, kind: LogKind, version: u64) -> StorageResult<Box<dyn LogChannel>> {
        Ok(Box::new(MemoryChannel {
            data: self.buffer(kind, version)?,
        }))
    }

    fn create(&self, kind: LogKind, version: u64) -> StorageResult<Box<dyn LogChannel>> {
        let data = Arc::new(RwLock::new(Vec::new()));
        self.files.write().insert((kind, version), Arc::clone(&data));
        Ok(Box::new(MemoryChannel { data }))
    }
}

/// Channel over one in-memory log version.
#[derive(Debug)]
struct MemoryChannel {
    data: Arc<RwLock<Vec<u8>>>,
}

impl LogChannel for MemoryChannel {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let offset_usize = offset as usize;
        let end = offset_usize.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[offset_usize..end].to_vec())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        if new_size > data.len() as u64 {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "cannot truncate to size {} which is greater than current size {}",
                    new_size,
                    data.len()
                ),
            )));
        }
        data.truncate(new_size as usize);
        Ok(())
    }
}
