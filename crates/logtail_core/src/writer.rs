//! Appending entries to a transaction log version.

use crate::entry::LogEntry;
use crate::error::TailResult;
use crate::files::LogFile;
use crate::header::{LogHeader, LOG_HEADER_SIZE};
use crate::store_id::StoreId;
use crate::types::LogPosition;
use logtail_storage::LogChannel;

/// Zeros are appended in chunks of this size during pre-allocation.
const PREALLOC_CHUNK: usize = 4 * 1024;

/// Writes entries to one transaction log version.
///
/// Creation stamps the file with a header carrying the store identity,
/// so a later tail scan can tell this store's files from a foreign
/// store's.
pub struct LogWriter {
    channel: Box<dyn LogChannel>,
    log_version: u64,
    offset: u64,
}

impl LogWriter {
    /// Creates a new log version and writes its header.
    pub fn create(log_file: &LogFile, version: u64, store_id: StoreId) -> TailResult<Self> {
        let mut channel = log_file.create_version(version)?;
        channel.append(&LogHeader::new(version, Some(store_id)).encode())?;
        Ok(Self {
            channel,
            log_version: version,
            offset: LOG_HEADER_SIZE,
        })
    }

    /// Opens an existing log version for appending at its current end.
    pub fn open(log_file: &LogFile, version: u64) -> TailResult<Self> {
        log_file.extract_header(version)?;
        let channel = log_file.open_for_version(version)?;
        let offset = channel.size()?;
        Ok(Self {
            channel,
            log_version: version,
            offset,
        })
    }

    /// Appends one entry and returns the position right after it.
    pub fn append(&mut self, entry: &LogEntry) -> TailResult<LogPosition> {
        let encoded = entry.encode();
        self.channel.append(&encoded)?;
        self.offset += encoded.len() as u64;
        Ok(self.position())
    }

    /// Extends the file with zeroed bytes.
    ///
    /// Readers treat a zero type byte as the end of the readable
    /// region, so pre-allocated space is invisible to the tail scan
    /// until entries overwrite it.
    pub fn preallocate(&mut self, bytes: u64) -> TailResult<()> {
        let zeros = [0u8; PREALLOC_CHUNK];
        let mut remaining = bytes;
        while remaining > 0 {
            let chunk = remaining.min(PREALLOC_CHUNK as u64) as usize;
            self.channel.append(&zeros[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    /// The position the next entry will land at.
    #[must_use]
    pub fn position(&self) -> LogPosition {
        LogPosition::new(self.log_version, self.offset)
    }

    /// Flushes buffered writes to the underlying channel.
    pub fn flush(&mut self) -> TailResult<()> {
        self.channel.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn append_raw(&mut self, bytes: &[u8]) -> TailResult<()> {
        self.channel.append(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }
}
