//! Checkpoint log: records and locator.
//!
//! A checkpoint records that everything before a transaction log
//! position is durably reflected in the main store. Checkpoint records
//! are fixed-size and live in their own log kind, so the latest one can
//! be found without touching the transaction logs.

use crate::entry::{compute_crc32, CRC_SIZE};
use crate::error::TailResult;
use crate::files::LogFile;
use crate::header::{LogHeader, LOG_HEADER_SIZE};
use crate::store_id::StoreId;
use crate::types::LogPosition;
use logtail_storage::{LogKind, LogStore};
use std::fmt;
use std::sync::Arc;

/// Wire type byte of a checkpoint record.
const CHECKPOINT_TYPE: u8 = 5;

/// On-disk size of one checkpoint record:
/// type (1) + log version (8) + byte offset (8) + store id (24) + crc (4).
const CHECKPOINT_RECORD_SIZE: usize = 1 + 8 + 8 + StoreId::ENCODED_LEN + CRC_SIZE;

/// A single checkpoint record read from the checkpoint log.
///
/// Immutable once constructed; this subsystem only reads checkpoints,
/// it never re-persists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointInfo {
    transaction_log_position: LogPosition,
    channel_position_after_checkpoint: LogPosition,
    store_id: StoreId,
}

impl CheckpointInfo {
    /// The transaction log position being checkpointed. Recovery
    /// replays from here.
    #[must_use]
    pub const fn transaction_log_position(self) -> LogPosition {
        self.transaction_log_position
    }

    /// The checkpoint log position right after this record.
    #[must_use]
    pub const fn channel_position_after_checkpoint(self) -> LogPosition {
        self.channel_position_after_checkpoint
    }

    /// The store identity recorded at checkpoint time.
    #[must_use]
    pub const fn store_id(self) -> StoreId {
        self.store_id
    }
}

impl fmt::Display for CheckpointInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checkpoint at {} for transaction log position {} ({})",
            self.channel_position_after_checkpoint, self.transaction_log_position, self.store_id
        )
    }
}

/// The checkpoint log and its locator operations.
#[derive(Debug, Clone)]
pub struct CheckpointFile {
    log: LogFile,
}

impl CheckpointFile {
    /// Creates a view over the checkpoint log of a store.
    #[must_use]
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self {
            log: LogFile::new(store, LogKind::Checkpoint),
        }
    }

    /// The underlying file collection, for position verification.
    #[must_use]
    pub fn log_file(&self) -> &LogFile {
        &self.log
    }

    /// Finds the most recent well-formed checkpoint record.
    ///
    /// Scans checkpoint log versions from the newest downward; within a
    /// version the last readable record wins. Returns `None` when the
    /// checkpoint log is empty or absent - a normal condition on first
    /// startup, not an error.
    pub fn find_latest_checkpoint(&self) -> TailResult<Option<CheckpointInfo>> {
        for version in self.log.versions()?.into_iter().rev() {
            if let Some(last) = self.scan_version(version)?.pop() {
                return Ok(Some(last));
            }
        }
        Ok(None)
    }

    /// All readable checkpoints, oldest first.
    ///
    /// Pays a full scan of every checkpoint log version; only the
    /// fallback path after a rejected latest checkpoint uses this.
    pub fn reachable_checkpoints(&self) -> TailResult<Vec<CheckpointInfo>> {
        let mut checkpoints = Vec::new();
        for version in self.log.versions()? {
            checkpoints.append(&mut self.scan_version(version)?);
        }
        Ok(checkpoints)
    }

    /// Reads every well-formed record of one checkpoint log version, in
    /// file order. A torn or zeroed record ends the readable region: a
    /// crash mid-append must not block startup.
    fn scan_version(&self, version: u64) -> TailResult<Vec<CheckpointInfo>> {
        if self.log.size_of_version(version)? < LOG_HEADER_SIZE {
            // created but never fully initialized
            return Ok(Vec::new());
        }
        self.log.extract_header(version)?;

        let channel = self.log.open_for_version(version)?;
        let size = channel.size()?;
        let mut offset = LOG_HEADER_SIZE;
        let mut checkpoints = Vec::new();

        while offset + CHECKPOINT_RECORD_SIZE as u64 <= size {
            let bytes = channel.read_at(offset, CHECKPOINT_RECORD_SIZE)?;
            if bytes[0] != CHECKPOINT_TYPE {
                break;
            }

            let body = &bytes[..CHECKPOINT_RECORD_SIZE - CRC_SIZE];
            let crc_at = CHECKPOINT_RECORD_SIZE - CRC_SIZE;
            let stored_crc = u32::from_le_bytes([
                bytes[crc_at],
                bytes[crc_at + 1],
                bytes[crc_at + 2],
                bytes[crc_at + 3],
            ]);
            if stored_crc != compute_crc32(body) {
                break;
            }

            let mut log_version = [0u8; 8];
            log_version.copy_from_slice(&bytes[1..9]);
            let mut byte_offset = [0u8; 8];
            byte_offset.copy_from_slice(&bytes[9..17]);
            let mut store_id = [0u8; StoreId::ENCODED_LEN];
            store_id.copy_from_slice(&bytes[17..17 + StoreId::ENCODED_LEN]);

            offset += CHECKPOINT_RECORD_SIZE as u64;
            checkpoints.push(CheckpointInfo {
                transaction_log_position: LogPosition::new(
                    u64::from_le_bytes(log_version),
                    u64::from_le_bytes(byte_offset),
                ),
                channel_position_after_checkpoint: LogPosition::new(version, offset),
                store_id: StoreId::decode(&store_id),
            });
        }

        Ok(checkpoints)
    }

    /// Appends a checkpoint record, creating the checkpoint log version
    /// (with header) if it does not exist yet.
    ///
    /// Part of the write path; the tail scan never calls this.
    pub fn append_checkpoint(
        &self,
        version: u64,
        transaction_log_position: LogPosition,
        store_id: StoreId,
    ) -> TailResult<CheckpointInfo> {
        let mut channel = if self.log.version_exists(version)? {
            self.log.open_for_version(version)?
        } else {
            let mut channel = self.log.create_version(version)?;
            channel.append(&LogHeader::new(version, Some(store_id)).encode())?;
            channel
        };

        let mut record = Vec::with_capacity(CHECKPOINT_RECORD_SIZE);
        record.push(CHECKPOINT_TYPE);
        record.extend_from_slice(&transaction_log_position.log_version().to_le_bytes());
        record.extend_from_slice(&transaction_log_position.byte_offset().to_le_bytes());
        record.extend_from_slice(&store_id.encode());
        let crc = compute_crc32(&record);
        record.extend_from_slice(&crc.to_le_bytes());

        let offset = channel.append(&record)?;
        channel.flush()?;

        Ok(CheckpointInfo {
            transaction_log_position,
            channel_position_after_checkpoint: LogPosition::new(
                version,
                offset + CHECKPOINT_RECORD_SIZE as u64,
            ),
            store_id,
        })
    }
}
