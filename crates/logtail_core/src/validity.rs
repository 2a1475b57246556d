//! Checkpoint and reader position validation.

use crate::checkpoint::CheckpointInfo;
use crate::error::{TailError, TailResult};
use crate::files::LogFile;
use crate::header::LOG_HEADER_SIZE;
use crate::types::LogPosition;
use logtail_storage::LogChannel;
use tracing::debug;

/// How many bytes past a position get probed for non-zero garbage.
///
/// Log files are pre-allocated with zeros, so on a clean shutdown the
/// region past the last entry is zeroed. A bounded probe keeps startup
/// cost independent of the pre-allocated size.
const PREALLOC_PROBE_LIMIT: u64 = 12 * 1024;

/// Validates that positions recorded in one log actually point at
/// readable, trustworthy places in another.
pub(crate) struct LogValidator<'a> {
    log_file: &'a LogFile,
    checkpoint_log_file: &'a LogFile,
    fail_on_corrupted: bool,
}

impl<'a> LogValidator<'a> {
    pub(crate) fn new(
        log_file: &'a LogFile,
        checkpoint_log_file: &'a LogFile,
        fail_on_corrupted: bool,
    ) -> Self {
        Self {
            log_file,
            checkpoint_log_file,
            fail_on_corrupted,
        }
    }

    /// Whether a checkpoint points at a usable place in the transaction
    /// log.
    ///
    /// Three conditions, all required: the referenced log version still
    /// exists, the file is at least as long as the referenced offset,
    /// and the file's store identity is compatible with the one the
    /// checkpoint recorded. A missing header identity counts as
    /// compatible.
    pub(crate) fn is_valid_checkpoint(&self, checkpoint: &CheckpointInfo) -> TailResult<bool> {
        let position = checkpoint.transaction_log_position();
        let version = position.log_version();

        if !self.log_file.version_exists(version)? {
            debug!(version, "checkpointed log version no longer exists");
            return Ok(false);
        }
        if self.log_file.size_of_version(version)? < position.byte_offset() {
            debug!(%position, "checkpointed position lies past the end of the file");
            return Ok(false);
        }
        if let Some(header_id) = self.log_file.extract_header(version)?.store_id() {
            if !header_id.is_compatible_with(checkpoint.store_id()) {
                debug!(
                    header = %header_id,
                    checkpoint = %checkpoint.store_id(),
                    "store identity mismatch between log header and checkpoint"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Verifies the checkpoint log around the latest record.
    ///
    /// The record's end position must lie within the file; that much is
    /// checked regardless of policy, so a vanished or shortened
    /// checkpoint file surfaces as a hard error. Only the requirement
    /// that trailing bytes after the record be zero is gated by the
    /// strict policy.
    pub(crate) fn verify_checkpoint_position(&self, checkpoint: &CheckpointInfo) -> TailResult<()> {
        let position = checkpoint.channel_position_after_checkpoint();
        let channel = self
            .checkpoint_log_file
            .open_for_version(position.log_version())?;
        let size = channel.size()?;
        Self::bounds_check(position, size, "checkpoint")?;
        if !self.fail_on_corrupted {
            return Ok(());
        }
        Self::probe_zeros(channel.as_ref(), position, size, "checkpoint")
    }

    /// Verifies that the position an entry reader stopped at is really
    /// the end of readable data.
    ///
    /// In the highest file the bytes past the stop point must be zeroed
    /// pre-allocation. Any other file must be consumed to its very end,
    /// so leftovers there are corruption no matter what they hold.
    pub(crate) fn verify_reader_position(&self, position: LogPosition) -> TailResult<()> {
        let version = position.log_version();
        let channel = self.log_file.open_for_version(version)?;
        let size = channel.size()?;
        Self::bounds_check(position, size, "transaction")?;

        let leftovers = size - position.byte_offset();
        if leftovers == 0 {
            return Ok(());
        }
        if self.log_file.highest_log_version()? != Some(version) {
            return Err(TailError::entry_corruption(
                version,
                format!(
                    "{leftovers} unreadable bytes after {position} in a transaction log file \
                     that is not the newest"
                ),
            ));
        }
        Self::probe_zeros(channel.as_ref(), position, size, "transaction")
    }

    fn bounds_check(position: LogPosition, size: u64, log_name: &'static str) -> TailResult<()> {
        if position.byte_offset() < LOG_HEADER_SIZE || position.byte_offset() > size {
            return Err(TailError::ReaderPositionMismatch {
                expected_version: position.log_version(),
                position,
                log_name,
            });
        }
        Ok(())
    }

    fn probe_zeros(
        channel: &dyn LogChannel,
        position: LogPosition,
        size: u64,
        log_name: &'static str,
    ) -> TailResult<()> {
        let leftovers = size - position.byte_offset();
        if leftovers == 0 {
            return Ok(());
        }
        let probe_len = leftovers.min(PREALLOC_PROBE_LIMIT) as usize;
        let probe = channel.read_at(position.byte_offset(), probe_len)?;
        if let Some(relative) = probe.iter().position(|byte| *byte != 0) {
            return Err(TailError::entry_corruption(
                position.log_version(),
                format!(
                    "unreadable non-zero bytes in the {log_name} log after {}, first at offset {}",
                    position,
                    position.byte_offset() + relative as u64
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointFile;
    use crate::store_id::StoreId;
    use crate::writer::LogWriter;
    use logtail_storage::{LogKind, LogStore, MemoryStore};
    use std::sync::Arc;

    struct Fixture {
        store: Arc<MemoryStore>,
        log_file: LogFile,
        checkpoint_file: CheckpointFile,
        store_id: StoreId,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let log_file = LogFile::new(
            Arc::clone(&store) as Arc<dyn LogStore>,
            LogKind::Transaction,
        );
        let checkpoint_file = CheckpointFile::new(Arc::clone(&store) as Arc<dyn LogStore>);
        Fixture {
            store,
            log_file,
            checkpoint_file,
            store_id: StoreId::random(),
        }
    }

    impl Fixture {
        fn validator(&self, fail_on_corrupted: bool) -> LogValidator<'_> {
            LogValidator::new(
                &self.log_file,
                self.checkpoint_file.log_file(),
                fail_on_corrupted,
            )
        }

        fn write_log(&self, version: u64, payload: &[u8]) -> LogPosition {
            let mut writer = LogWriter::create(&self.log_file, version, self.store_id).unwrap();
            writer.append_raw(payload).unwrap();
            writer.flush().unwrap();
            LogPosition::new(version, LOG_HEADER_SIZE + payload.len() as u64)
        }
    }

    #[test]
    fn checkpoint_into_missing_version_is_invalid() {
        let f = fixture();
        let checkpoint = f
            .checkpoint_file
            .append_checkpoint(0, LogPosition::new(7, 100), f.store_id)
            .unwrap();
        assert!(!f.validator(true).is_valid_checkpoint(&checkpoint).unwrap());
    }

    #[test]
    fn checkpoint_past_end_of_file_is_invalid() {
        let f = fixture();
        let end = f.write_log(0, &[0u8; 16]);
        let checkpoint = f
            .checkpoint_file
            .append_checkpoint(0, LogPosition::new(0, end.byte_offset() + 1), f.store_id)
            .unwrap();
        assert!(!f.validator(true).is_valid_checkpoint(&checkpoint).unwrap());
    }

    #[test]
    fn checkpoint_with_foreign_store_id_is_invalid() {
        let f = fixture();
        let end = f.write_log(0, &[]);
        let checkpoint = f
            .checkpoint_file
            .append_checkpoint(0, end, StoreId::random())
            .unwrap();
        assert!(!f.validator(true).is_valid_checkpoint(&checkpoint).unwrap());
    }

    #[test]
    fn checkpoint_at_end_of_existing_file_is_valid() {
        let f = fixture();
        let end = f.write_log(0, &[]);
        let checkpoint = f
            .checkpoint_file
            .append_checkpoint(0, end, f.store_id)
            .unwrap();
        assert!(f.validator(true).is_valid_checkpoint(&checkpoint).unwrap());
    }

    #[test]
    fn zeroed_preallocation_past_reader_position_is_fine() {
        let f = fixture();
        let end = f.write_log(0, &[0u8; 4096]);
        let position = LogPosition::new(0, end.byte_offset() - 4096);
        f.validator(true).verify_reader_position(position).unwrap();
    }

    #[test]
    fn garbage_past_reader_position_is_corruption() {
        let f = fixture();
        let mut payload = vec![0u8; 512];
        payload[100] = 0xAB;
        f.write_log(0, &payload);
        let position = LogPosition::new(0, LOG_HEADER_SIZE);
        let err = f
            .validator(true)
            .verify_reader_position(position)
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn garbage_beyond_the_probe_limit_is_not_seen() {
        let f = fixture();
        let mut payload = vec![0u8; PREALLOC_PROBE_LIMIT as usize + 64];
        let last = payload.len() - 1;
        payload[last] = 0xAB;
        f.write_log(0, &payload);
        let position = LogPosition::new(0, LOG_HEADER_SIZE);
        f.validator(true).verify_reader_position(position).unwrap();
    }

    #[test]
    fn fully_consumed_non_highest_file_is_fine() {
        let f = fixture();
        f.write_log(0, &[]);
        f.write_log(1, &[]);
        f.validator(true)
            .verify_reader_position(LogPosition::new(0, LOG_HEADER_SIZE))
            .unwrap();
    }

    #[test]
    fn leftovers_in_non_highest_file_are_corruption() {
        let f = fixture();
        // even all-zero leftovers: only the newest file may end early
        f.write_log(0, &[0u8; 128]);
        f.write_log(1, &[]);
        let err = f
            .validator(true)
            .verify_reader_position(LogPosition::new(0, LOG_HEADER_SIZE))
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn reader_position_out_of_bounds_is_a_mismatch() {
        let f = fixture();
        let end = f.write_log(0, &[]);
        let err = f
            .validator(true)
            .verify_reader_position(LogPosition::new(0, end.byte_offset() + 1))
            .unwrap_err();
        assert!(matches!(err, TailError::ReaderPositionMismatch { .. }));
    }

    #[test]
    fn checkpoint_padding_probe_is_policy_gated() {
        let f = fixture();
        f.write_log(0, &[]);
        let checkpoint = f
            .checkpoint_file
            .append_checkpoint(0, LogPosition::new(0, LOG_HEADER_SIZE), f.store_id)
            .unwrap();
        // garbage after the record fails only strict verification
        let mut channel = f.store.open(LogKind::Checkpoint, 0).unwrap();
        channel.append(&[0xFF; 8]).unwrap();

        f.validator(false)
            .verify_checkpoint_position(&checkpoint)
            .unwrap();
        assert!(f
            .validator(true)
            .verify_checkpoint_position(&checkpoint)
            .is_err());
    }

    #[test]
    fn shortened_checkpoint_file_fails_even_in_best_effort_mode() {
        let f = fixture();
        f.write_log(0, &[]);
        let checkpoint = f
            .checkpoint_file
            .append_checkpoint(0, LogPosition::new(0, LOG_HEADER_SIZE), f.store_id)
            .unwrap();
        let mut channel = f.store.open(LogKind::Checkpoint, 0).unwrap();
        channel.truncate(LOG_HEADER_SIZE).unwrap();

        let err = f
            .validator(false)
            .verify_checkpoint_position(&checkpoint)
            .unwrap_err();
        assert!(matches!(err, TailError::ReaderPositionMismatch { .. }));
    }
}
