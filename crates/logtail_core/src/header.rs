//! Log file headers.
//!
//! Every log file, transaction and checkpoint alike, starts with a
//! fixed 64-byte header block. The first entry of a file always lives
//! at offset [`LOG_HEADER_SIZE`]; the unused remainder of the block is
//! zero.

use crate::error::{TailError, TailResult};
use crate::store_id::StoreId;
use crate::types::LogPosition;

/// Magic bytes identifying a log file.
pub const LOG_MAGIC: [u8; 4] = *b"TLOG";

/// Current log file format version.
pub const LOG_FORMAT_VERSION: u16 = 1;

/// Size of the header block. The first entry starts here.
pub const LOG_HEADER_SIZE: u64 = 64;

/// Per-file metadata, read once when a file is opened and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    format_version: u16,
    log_version: u64,
    store_id: Option<StoreId>,
}

impl LogHeader {
    /// Creates a header for a new log file at the current format.
    #[must_use]
    pub const fn new(log_version: u64, store_id: Option<StoreId>) -> Self {
        Self {
            format_version: LOG_FORMAT_VERSION,
            log_version,
            store_id,
        }
    }

    /// The on-disk format version this file was written with.
    #[must_use]
    pub const fn format_version(self) -> u16 {
        self.format_version
    }

    /// The log version this file carries. Matches the file name.
    #[must_use]
    pub const fn log_version(self) -> u64 {
        self.log_version
    }

    /// The store identity recorded when the file was created, if any.
    ///
    /// Pre-identity log files carry none; validity checks treat that as
    /// "matches anything".
    #[must_use]
    pub const fn store_id(self) -> Option<StoreId> {
        self.store_id
    }

    /// The position of the first entry in this file.
    #[must_use]
    pub const fn start_position(self) -> LogPosition {
        LogPosition::new(self.log_version, LOG_HEADER_SIZE)
    }

    /// Encodes the header into its 64-byte block.
    #[must_use]
    pub fn encode(self) -> [u8; LOG_HEADER_SIZE as usize] {
        let mut buf = [0u8; LOG_HEADER_SIZE as usize];
        buf[..4].copy_from_slice(&LOG_MAGIC);
        buf[4..6].copy_from_slice(&self.format_version.to_le_bytes());
        buf[6..14].copy_from_slice(&self.log_version.to_le_bytes());
        if let Some(store_id) = self.store_id {
            buf[14] = 1;
            buf[15..15 + StoreId::ENCODED_LEN].copy_from_slice(&store_id.encode());
        }
        buf
    }

    /// Decodes the header of the file for `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::InvalidHeader`] if the block is truncated,
    /// the magic or format version is wrong, or the embedded log version
    /// does not match the file name.
    pub fn decode(expected_version: u64, bytes: &[u8]) -> TailResult<Self> {
        if bytes.len() < LOG_HEADER_SIZE as usize {
            return Err(TailError::invalid_header(
                expected_version,
                format!("header truncated: {} bytes", bytes.len()),
            ));
        }
        if bytes[..4] != LOG_MAGIC {
            return Err(TailError::invalid_header(expected_version, "bad magic"));
        }

        let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if format_version > LOG_FORMAT_VERSION {
            return Err(TailError::invalid_header(
                expected_version,
                format!("unsupported format version {format_version}"),
            ));
        }

        let mut log_version = [0u8; 8];
        log_version.copy_from_slice(&bytes[6..14]);
        let log_version = u64::from_le_bytes(log_version);
        if log_version != expected_version {
            return Err(TailError::invalid_header(
                expected_version,
                format!("header names log version {log_version}"),
            ));
        }

        let store_id = match bytes[14] {
            0 => None,
            1 => {
                let mut encoded = [0u8; StoreId::ENCODED_LEN];
                encoded.copy_from_slice(&bytes[15..15 + StoreId::ENCODED_LEN]);
                Some(StoreId::decode(&encoded))
            }
            flag => {
                return Err(TailError::invalid_header(
                    expected_version,
                    format!("bad store id flag {flag}"),
                ));
            }
        };

        Ok(Self {
            format_version,
            log_version,
            store_id,
        })
    }
}
