//! Low-level single-entry decoder.
//!
//! Reads entries one-by-one from a channel with a fixed read buffer, so
//! memory stays constant regardless of log size. The reader stops
//! cleanly at end-of-file or at the first zero type byte (pre-allocated
//! space); a torn entry or checksum mismatch is corruption, not end.

use crate::entry::{compute_crc32, EntryKind, LogEntry, CRC_SIZE};
use crate::error::{TailError, TailResult};
use crate::types::LogPosition;
use logtail_storage::LogChannel;

/// Read buffer size for streaming decoding.
const READ_BUFFER_SIZE: usize = 64 * 1024; // 64 KB

/// Streaming decoder over one log file version.
///
/// Tracks the last successfully consumed position so callers can verify
/// that a file was fully read before rolling to the next version.
pub struct EntryReader {
    channel: Box<dyn LogChannel>,
    log_version: u64,
    total_size: u64,
    /// Offset of the next unconsumed byte in the file.
    current_offset: u64,
    buffer: Vec<u8>,
    buffer_pos: usize,
    buffer_len: usize,
    finished: bool,
}

impl EntryReader {
    /// Creates a reader over `channel` starting at `position`.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel size cannot be determined or the
    /// position lies past end-of-file.
    pub fn new(channel: Box<dyn LogChannel>, position: LogPosition) -> TailResult<Self> {
        let total_size = channel.size()?;
        if position.byte_offset() > total_size {
            return Err(TailError::entry_corruption(
                position.log_version(),
                format!(
                    "read position {position} is past end of file ({total_size} bytes)"
                ),
            ));
        }
        Ok(Self {
            channel,
            log_version: position.log_version(),
            total_size,
            current_offset: position.byte_offset(),
            buffer: vec![0u8; READ_BUFFER_SIZE],
            buffer_pos: 0,
            buffer_len: 0,
            finished: false,
        })
    }

    /// The log version this reader decodes.
    #[must_use]
    pub fn log_version(&self) -> u64 {
        self.log_version
    }

    /// Position just after the last successfully consumed entry.
    #[must_use]
    pub fn last_position(&self) -> LogPosition {
        LogPosition::new(self.log_version, self.current_offset)
    }

    /// Reads the next entry.
    ///
    /// Returns `Ok(None)` at end-of-file or at pre-allocated space.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::EntryCorruption`] for an unknown type byte,
    /// a checksum mismatch, or an entry torn by truncation; storage
    /// errors propagate unchanged.
    pub fn read_entry(&mut self) -> TailResult<Option<LogEntry>> {
        if self.finished {
            return Ok(None);
        }

        if !self.ensure_buffered(1)? {
            // clean end: file consumed exactly at an entry boundary
            self.finished = true;
            return Ok(None);
        }

        let type_byte = self.buffer[self.buffer_pos];
        if type_byte == 0 {
            // pre-allocated space; the validity check confirms the rest is zero
            self.finished = true;
            return Ok(None);
        }

        let entry_offset = self.current_offset;
        let Some(kind) = EntryKind::from_byte(type_byte) else {
            self.finished = true;
            return Err(TailError::entry_corruption(
                self.log_version,
                format!("unknown entry type {type_byte} at offset {entry_offset}"),
            ));
        };

        let payload_len = match kind.fixed_payload_len() {
            Some(len) => len,
            None => {
                // length-prefixed payload: the prefix itself must be present
                if !self.ensure_buffered(1 + 4)? {
                    self.finished = true;
                    return Err(self.torn(kind, entry_offset));
                }
                let at = self.buffer_pos + 1;
                let len = u32::from_le_bytes([
                    self.buffer[at],
                    self.buffer[at + 1],
                    self.buffer[at + 2],
                    self.buffer[at + 3],
                ]) as usize;
                4 + len
            }
        };

        let total_len = 1 + payload_len + CRC_SIZE;
        if !self.ensure_buffered(total_len)? {
            self.finished = true;
            return Err(self.torn(kind, entry_offset));
        }

        let body = &self.buffer[self.buffer_pos..self.buffer_pos + 1 + payload_len];
        let crc_at = self.buffer_pos + 1 + payload_len;
        let stored_crc = u32::from_le_bytes([
            self.buffer[crc_at],
            self.buffer[crc_at + 1],
            self.buffer[crc_at + 2],
            self.buffer[crc_at + 3],
        ]);
        let computed_crc = compute_crc32(body);
        if stored_crc != computed_crc {
            self.finished = true;
            return Err(TailError::entry_corruption(
                self.log_version,
                format!(
                    "checksum mismatch at offset {entry_offset}: \
                     expected {stored_crc:08x}, got {computed_crc:08x}"
                ),
            ));
        }

        let entry = LogEntry::decode_payload(self.log_version, kind, &body[1..])?;

        self.buffer_pos += total_len;
        self.current_offset += total_len as u64;
        Ok(Some(entry))
    }

    fn torn(&self, kind: EntryKind, offset: u64) -> TailError {
        TailError::entry_corruption(
            self.log_version,
            format!("{kind:?} entry at offset {offset} torn by truncation"),
        )
    }

    /// Ensures at least `min_bytes` are buffered from the current
    /// position. Returns false if the file does not hold that many more
    /// bytes. Grows the buffer for oversized entries.
    fn ensure_buffered(&mut self, min_bytes: usize) -> TailResult<bool> {
        let available = self.buffer_len - self.buffer_pos;
        if available >= min_bytes {
            return Ok(true);
        }

        let remaining_in_file = (self.total_size - self.current_offset) as usize - available;
        if remaining_in_file < min_bytes - available {
            return Ok(false);
        }

        // shift the unconsumed remainder to the front
        if self.buffer_pos > 0 && available > 0 {
            self.buffer.copy_within(self.buffer_pos..self.buffer_len, 0);
        }
        self.buffer_len = available;
        self.buffer_pos = 0;

        if min_bytes > self.buffer.len() {
            self.buffer.resize(min_bytes.next_power_of_two(), 0);
        }

        let bytes_to_read = std::cmp::min(self.buffer.len() - self.buffer_len, remaining_in_file);
        if bytes_to_read > 0 {
            let read_offset = self.current_offset + self.buffer_len as u64;
            let data = self.channel.read_at(read_offset, bytes_to_read)?;
            self.buffer[self.buffer_len..self.buffer_len + data.len()].copy_from_slice(&data);
            self.buffer_len += data.len();
        }

        Ok(self.buffer_len - self.buffer_pos >= min_bytes)
    }
}
