//! Forward scan for transaction entries after a checkpoint.

use crate::entry::LogEntry;
use crate::error::{TailError, TailResult};
use crate::files::LogFile;
use crate::monitor::CorruptionMonitor;
use crate::reader::EntryReader;
use crate::types::{KernelVersion, LogPosition, TransactionId};
use crate::validity::LogValidator;
use tracing::debug;

/// The entry that closes a transaction on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// The transaction committed whole.
    Commit {
        /// Id of the committed transaction.
        transaction_id: TransactionId,
    },
    /// A chunk boundary of a transaction that spans log files.
    ChunkEnd {
        /// Id of the chunked transaction.
        transaction_id: TransactionId,
        /// Index of the finished chunk.
        chunk_id: u64,
    },
}

impl Terminal {
    /// The transaction this terminal belongs to.
    #[must_use]
    pub fn transaction_id(self) -> TransactionId {
        match self {
            Self::Commit { transaction_id } | Self::ChunkEnd { transaction_id, .. } => {
                transaction_id
            }
        }
    }
}

/// What the forward scan found past the checkpointed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TailEntries {
    pub(crate) start_kernel_version: Option<KernelVersion>,
    pub(crate) terminal: Option<Terminal>,
    pub(crate) corrupted: bool,
}

impl TailEntries {
    /// Whether transaction work exists after the checkpoint.
    ///
    /// A `Start` without any terminal means the append of the first
    /// transaction never got far enough to matter; that alone does not
    /// count. Swallowed corruption does: the region is suspect, so
    /// recovery must treat it as occupied.
    #[must_use]
    pub fn entry_found(&self) -> bool {
        (self.start_kernel_version.is_some() && self.terminal.is_some()) || self.corrupted
    }

    /// The terminal entry, when one was read cleanly.
    #[must_use]
    pub fn terminal(&self) -> Option<Terminal> {
        self.terminal
    }

    /// Id of the transaction the terminal closed.
    #[must_use]
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.terminal.map(Terminal::transaction_id)
    }

    /// Kernel version recorded in the first `Start` entry.
    #[must_use]
    pub fn kernel_version(&self) -> Option<KernelVersion> {
        self.start_kernel_version
    }

    /// Whether the scan stopped at swallowed corruption.
    #[must_use]
    pub fn corrupted(&self) -> bool {
        self.corrupted
    }

    fn complete(&self) -> bool {
        self.start_kernel_version.is_some() && self.terminal.is_some()
    }
}

/// Scans transaction log versions forward from a position, looking for
/// the first complete transaction.
pub struct EntryCursor<'a> {
    log_file: &'a LogFile,
    validator: &'a LogValidator<'a>,
    monitor: &'a dyn CorruptionMonitor,
    fail_on_corrupted: bool,
}

impl<'a> EntryCursor<'a> {
    pub(crate) fn new(
        log_file: &'a LogFile,
        validator: &'a LogValidator<'a>,
        monitor: &'a dyn CorruptionMonitor,
        fail_on_corrupted: bool,
    ) -> Self {
        Self {
            log_file,
            validator,
            monitor,
            fail_on_corrupted,
        }
    }

    /// Walks versions upward from `from`, reading entries until a
    /// `Start` and a terminal have both been seen or the readable data
    /// runs out.
    ///
    /// Corruption in strict mode escalates to
    /// [`TailError::RecoveryBlocked`]; in best-effort mode it is
    /// reported to the monitor and ends the scan with the
    /// [`corrupted`](TailEntries::corrupted) flag set.
    pub fn find_tail_entries(&self, from: LogPosition) -> TailResult<TailEntries> {
        let mut entries = TailEntries::default();
        let mut version = from.log_version();
        let mut position = from;

        while self.log_file.version_exists(version)? {
            match self.scan_version(version, position, &mut entries) {
                Ok(()) if entries.complete() => return Ok(entries),
                Ok(()) => {}
                Err(err) if err.is_corruption() => {
                    self.monitor.corrupted_log_file(version, &err);
                    if self.fail_on_corrupted {
                        return Err(TailError::recovery_blocked(err));
                    }
                    debug!(version, error = %err, "ignoring corrupt log tail");
                    entries.corrupted = true;
                    return Ok(entries);
                }
                Err(err) => return Err(err),
            }
            version += 1;
            if self.log_file.version_exists(version)? {
                position = self.log_file.extract_header(version)?.start_position();
            }
        }
        Ok(entries)
    }

    fn scan_version(
        &self,
        version: u64,
        position: LogPosition,
        entries: &mut TailEntries,
    ) -> TailResult<()> {
        let mut reader = EntryReader::new(self.log_file.open_for_version(version)?, position)?;
        while let Some(entry) = reader.read_entry()? {
            match entry {
                LogEntry::Start { kernel_version, .. } => {
                    if entries.start_kernel_version.is_none() {
                        entries.start_kernel_version = Some(kernel_version);
                    }
                }
                LogEntry::Commit { transaction_id, .. } => {
                    if entries.terminal.is_none() {
                        entries.terminal = Some(Terminal::Commit { transaction_id });
                    }
                }
                LogEntry::ChunkEnd {
                    transaction_id,
                    chunk_id,
                    ..
                } => {
                    if entries.terminal.is_none() {
                        entries.terminal = Some(Terminal::ChunkEnd {
                            transaction_id,
                            chunk_id,
                        });
                    }
                }
                LogEntry::Command { .. } => {}
            }
            if entries.complete() {
                return Ok(());
            }
        }

        // Readable data ran out before a complete transaction. The stop
        // point must be the true end of readable data: zeroed
        // pre-allocation in the highest file, exactly end-of-file in
        // every other.
        if !entries.complete() {
            self.validator.verify_reader_position(reader.last_position())?;
        }
        Ok(())
    }
}
