//! The tail scan orchestrator.

use crate::checkpoint::{CheckpointFile, CheckpointInfo};
use crate::cursor::{EntryCursor, TailEntries};
use crate::error::{TailError, TailResult};
use crate::files::LogFile;
use crate::header::LOG_HEADER_SIZE;
use crate::metadata::{KernelVersionProvider, LogTailMetadata};
use crate::monitor::CorruptionMonitor;
use crate::types::LogPosition;
use crate::validity::LogValidator;
use logtail_storage::{LogKind, LogStore};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Policy knobs for the tail scan.
#[derive(Debug, Clone, Copy)]
pub struct TailScanConfig {
    fail_on_corrupted_log_files: bool,
}

impl TailScanConfig {
    /// Sets whether corruption in the log tail aborts startup.
    ///
    /// `true` (the default) refuses to recover past corruption;
    /// `false` recovers as much as possible and treats the corrupt
    /// region as the end of the log.
    #[must_use]
    pub fn fail_on_corrupted_log_files(mut self, fail: bool) -> Self {
        self.fail_on_corrupted_log_files = fail;
        self
    }
}

impl Default for TailScanConfig {
    fn default() -> Self {
        Self {
            fail_on_corrupted_log_files: true,
        }
    }
}

/// Determines the authoritative state of the log tail at startup.
///
/// The scan runs at most once: [`get_tail_metadata`] computes the
/// snapshot on first call and serves the same `Arc` afterwards.
///
/// [`get_tail_metadata`]: Self::get_tail_metadata
pub struct TailScanner {
    log_file: LogFile,
    checkpoint_file: CheckpointFile,
    config: TailScanConfig,
    monitor: Arc<dyn CorruptionMonitor>,
    fallback_kernel_version: Arc<dyn KernelVersionProvider>,
    tail: Mutex<Option<Arc<LogTailMetadata>>>,
}

impl TailScanner {
    /// Creates a scanner over the logs of one store.
    pub fn new(
        store: Arc<dyn LogStore>,
        config: TailScanConfig,
        monitor: Arc<dyn CorruptionMonitor>,
        fallback_kernel_version: Arc<dyn KernelVersionProvider>,
    ) -> Self {
        Self {
            log_file: LogFile::new(Arc::clone(&store), LogKind::Transaction),
            checkpoint_file: CheckpointFile::new(store),
            config,
            monitor,
            fallback_kernel_version,
            tail: Mutex::new(None),
        }
    }

    /// The tail state, computed on first call and cached.
    ///
    /// Repeated calls return the same snapshot; two handles from the
    /// same scanner compare equal with `Arc::ptr_eq`.
    pub fn get_tail_metadata(&self) -> TailResult<Arc<LogTailMetadata>> {
        let mut cached = self.tail.lock();
        if let Some(tail) = cached.as_ref() {
            return Ok(Arc::clone(tail));
        }
        let tail = Arc::new(self.find_log_tail()?);
        debug!(?tail, "log tail determined");
        *cached = Some(Arc::clone(&tail));
        Ok(tail)
    }

    fn find_log_tail(&self) -> TailResult<LogTailMetadata> {
        let highest = self.log_file.highest_log_version()?;
        let lowest = self.log_file.lowest_log_version()?;

        let checkpoint = match self.checkpoint_file.find_latest_checkpoint()? {
            Some(latest) => self.resolve_checkpoint(latest)?,
            None => {
                debug!("no checkpoint found in the checkpoint log");
                None
            }
        };

        match checkpoint {
            Some(checkpoint) => self.tail_after_checkpoint(checkpoint, lowest, highest),
            None => self.tail_without_checkpoint(lowest, highest),
        }
    }

    /// Decides which checkpoint, if any, the tail is anchored on.
    ///
    /// The latest well-formed checkpoint normally wins. When it points
    /// at an unusable place the strict policy aborts startup; the
    /// best-effort policy walks earlier checkpoints, newest first, and
    /// falls back to a full scan when none of them is usable either.
    fn resolve_checkpoint(&self, latest: CheckpointInfo) -> TailResult<Option<CheckpointInfo>> {
        let validator = self.validator();
        if let Err(err) = validator.verify_checkpoint_position(&latest) {
            if !err.is_corruption() {
                return Err(err);
            }
            self.monitor
                .corrupted_log_file(latest.channel_position_after_checkpoint().log_version(), &err);
            return Err(TailError::recovery_blocked(err));
        }

        if validator.is_valid_checkpoint(&latest)? {
            return Ok(Some(latest));
        }
        if self.config.fail_on_corrupted_log_files {
            return Err(TailError::recovery_blocked_message(format!(
                "last available {latest} does not point to a valid location in the transaction logs"
            )));
        }

        warn!(
            checkpoint = %latest,
            "latest checkpoint is unusable, looking for an earlier one"
        );
        for earlier in self
            .checkpoint_file
            .reachable_checkpoints()?
            .iter()
            .rev()
            .skip(1)
        {
            if validator.is_valid_checkpoint(earlier)? {
                return Ok(Some(*earlier));
            }
        }
        warn!("no usable checkpoint at all, scanning the transaction logs from the start");
        Ok(None)
    }

    fn tail_after_checkpoint(
        &self,
        checkpoint: CheckpointInfo,
        lowest: Option<u64>,
        highest: Option<u64>,
    ) -> TailResult<LogTailMetadata> {
        let entries = self.scan_entries(checkpoint.transaction_log_position())?;
        self.assemble(Some(checkpoint), entries, lowest, highest)
    }

    fn tail_without_checkpoint(
        &self,
        lowest: Option<u64>,
        highest: Option<u64>,
    ) -> TailResult<LogTailMetadata> {
        let entries = match lowest {
            Some(version) => {
                let start = if self.log_file.size_of_version(version)? >= LOG_HEADER_SIZE {
                    self.log_file.extract_header(version)?.start_position()
                } else {
                    LogPosition::new(version, LOG_HEADER_SIZE)
                };
                self.scan_entries(start)?
            }
            None => TailEntries::default(),
        };
        self.assemble(None, entries, lowest, highest)
    }

    fn scan_entries(&self, from: LogPosition) -> TailResult<TailEntries> {
        let validator = self.validator();
        EntryCursor::new(
            &self.log_file,
            &validator,
            self.monitor.as_ref(),
            self.config.fail_on_corrupted_log_files,
        )
        .find_tail_entries(from)
    }

    fn assemble(
        &self,
        checkpoint: Option<CheckpointInfo>,
        entries: TailEntries,
        lowest: Option<u64>,
        highest: Option<u64>,
    ) -> TailResult<LogTailMetadata> {
        // A checkpoint carries the authoritative identity: its recorded
        // generation may trail the header's after an in-place upgrade.
        let store_id = match checkpoint {
            Some(checkpoint) => Some(checkpoint.store_id()),
            None => match highest {
                Some(version) if self.log_file.size_of_version(version)? >= LOG_HEADER_SIZE => {
                    self.log_file.extract_header(version)?.store_id()
                }
                _ => None,
            },
        };
        Ok(LogTailMetadata {
            checkpoint,
            entry_found: entries.entry_found(),
            last_transaction_id: entries.transaction_id(),
            lowest_version_unknown: entries.corrupted(),
            lowest_log_version: lowest,
            highest_log_version: highest,
            entry_kernel_version: entries.kernel_version(),
            store_id,
            fallback_kernel_version: Arc::clone(&self.fallback_kernel_version),
        })
    }

    fn validator(&self) -> LogValidator<'_> {
        LogValidator::new(
            &self.log_file,
            self.checkpoint_file.log_file(),
            self.config.fail_on_corrupted_log_files,
        )
    }
}
