//! Directory-backed log store for persistent logs.

use crate::error::{StorageError, StorageResult};
use crate::store::{LogChannel, LogKind, LogStore};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A directory-backed log store.
///
/// Log versions live as individual files named
/// `<kind>.<version>.log`, e.g. `transaction.0.log` or
/// `checkpoint.12.log`. The naming scheme is the source of truth for
/// version discovery: the store never opens a file to answer
/// [`LogStore::versions`] or [`LogStore::contains`].
///
/// # Durability
///
/// - `flush()` calls `File::sync_all()` so appended records survive a
///   process crash
///
/// # Example
///
/// ```no_run
/// use logtail_storage::{FileStore, LogKind, LogStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("logs")).unwrap();
/// let mut channel = store.create(LogKind::Transaction, 0).unwrap();
/// channel.append(b"entry bytes").unwrap();
/// channel.flush().unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store over the given directory, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the path exists but is not a directory, or
    /// the directory cannot be created.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
        if !dir.is_dir() {
            return Err(StorageError::InvalidDirectory(format!(
                "path is not a directory: {}",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Returns the directory this store reads from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path a version lives at.
    #[must_use]
    pub fn path_for(&self, kind: LogKind, version: u64) -> PathBuf {
        self.dir
            .join(format!("{}.{version}.log", kind.file_prefix()))
    }

    fn parse_version(kind: LogKind, file_name: &str) -> Option<u64> {
        let rest = file_name.strip_prefix(kind.file_prefix())?;
        let rest = rest.strip_prefix('.')?;
        let digits = rest.strip_suffix(".log")?;
        digits.parse().ok()
    }
}

impl LogStore for FileStore {
    fn versions(&self, kind: LogKind) -> StorageResult<Vec<u64>> {
        let mut versions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(version) = Self::parse_version(kind, name) {
                    versions.push(version);
                }
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn contains(&self, kind: LogKind, version: u64) -> StorageResult<bool> {
        Ok(self.path_for(kind, version).is_file())
    }

    fn size(&self, kind: LogKind, version: u64) -> StorageResult<u64> {
        let path = self.path_for(kind, version);
        if !path.is_file() {
            return Err(StorageError::VersionNotFound { kind, version });
        }
        Ok(path.metadata()?.len())
    }

    fn open(&self, kind: LogKind, version: u64) -> StorageResult<Box<dyn LogChannel>> {
        let path = self.path_for(kind, version);
        if !path.is_file() {
            return Err(StorageError::VersionNotFound { kind, version });
        }
        Ok(Box::new(FileChannel::open(&path)?))
    }

    fn create(&self, kind: LogKind, version: u64) -> StorageResult<Box<dyn LogChannel>> {
        Ok(Box::new(FileChannel::open(&self.path_for(kind, version))?))
    }
}

/// Channel over one log file, opened for reading and appending.
#[derive(Debug)]
struct FileChannel {
    file: RwLock<File>,
    size: RwLock<u64>,
}

impl FileChannel {
    fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: RwLock::new(file),
            size: RwLock::new(size),
        })
    }
}

impl LogChannel for FileChannel {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if data.is_empty() {
            return Ok(*self.size.read());
        }

        let mut file = self.file.write();
        let mut size = self.size.write();

        let offset = *size;
        file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;
        *size += data.len() as u64;

        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        let file = self.file.write();
        file.sync_all()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let file = self.file.write();
        let mut size = self.size.write();

        if new_size > *size {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "cannot truncate to size {new_size} which is greater than current size {}",
                    *size
                ),
            )));
        }

        file.set_len(new_size)?;
        file.sync_all()?;
        *size = new_size;
        Ok(())
    }
}
