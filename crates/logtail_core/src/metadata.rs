//! The tail scan result snapshot.

use crate::checkpoint::CheckpointInfo;
use crate::store_id::StoreId;
use crate::types::{KernelVersion, TransactionId};
use std::fmt;
use std::sync::Arc;

/// Supplies the kernel version to assume when the log tail carries no
/// transaction entry to read one from.
pub trait KernelVersionProvider: Send + Sync {
    /// The kernel version new transactions should be written with.
    fn kernel_version(&self) -> KernelVersion;
}

/// Provider that always answers with the newest known kernel version.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestKernelVersion;

impl KernelVersionProvider for LatestKernelVersion {
    fn kernel_version(&self) -> KernelVersion {
        KernelVersion::LATEST
    }
}

/// Everything recovery needs to know about the state of the log tail.
///
/// Produced once by [`TailScanner::get_tail_metadata`] and shared
/// immutably afterwards.
///
/// [`TailScanner::get_tail_metadata`]: crate::TailScanner::get_tail_metadata
#[derive(Clone)]
pub struct LogTailMetadata {
    pub(crate) checkpoint: Option<CheckpointInfo>,
    pub(crate) entry_found: bool,
    pub(crate) last_transaction_id: Option<TransactionId>,
    pub(crate) lowest_version_unknown: bool,
    pub(crate) lowest_log_version: Option<u64>,
    pub(crate) highest_log_version: Option<u64>,
    pub(crate) entry_kernel_version: Option<KernelVersion>,
    pub(crate) store_id: Option<StoreId>,
    pub(crate) fallback_kernel_version: Arc<dyn KernelVersionProvider>,
}

impl LogTailMetadata {
    /// The last valid checkpoint, if any was found and accepted.
    #[must_use]
    pub fn last_checkpoint(&self) -> Option<CheckpointInfo> {
        self.checkpoint
    }

    /// Whether any transaction work exists after the checkpointed
    /// position. `true` means recovery has something to replay, or that
    /// corruption past the checkpoint makes the region suspect.
    #[must_use]
    pub fn entry_found(&self) -> bool {
        self.entry_found
    }

    /// The id of the last cleanly committed transaction after the
    /// checkpoint. `None` when no committed transaction was readable,
    /// including the case where [`entry_found`](Self::entry_found) is
    /// `true` only because of corruption.
    #[must_use]
    pub fn last_transaction_id(&self) -> Option<TransactionId> {
        self.last_transaction_id
    }

    /// Whether older log versions may exist that the scan never
    /// visited. A best-effort scan that stopped at corruption cannot
    /// vouch for anything below the version it stopped in.
    #[must_use]
    pub fn lowest_version_unknown(&self) -> bool {
        self.lowest_version_unknown
    }

    /// The lowest transaction log version present on disk, when known.
    #[must_use]
    pub fn lowest_log_version(&self) -> Option<u64> {
        if self.lowest_version_unknown {
            None
        } else {
            self.lowest_log_version
        }
    }

    /// The highest transaction log version present on disk.
    #[must_use]
    pub fn highest_log_version(&self) -> Option<u64> {
        self.highest_log_version
    }

    /// The kernel version to continue the log with: the one read from
    /// the tail entries when present, the provider's answer otherwise.
    #[must_use]
    pub fn kernel_version(&self) -> KernelVersion {
        self.entry_kernel_version
            .unwrap_or_else(|| self.fallback_kernel_version.kernel_version())
    }

    /// The store identity read from the highest log file header, when
    /// that file exists and carries one.
    #[must_use]
    pub fn store_id(&self) -> Option<StoreId> {
        self.store_id
    }
}

impl fmt::Debug for LogTailMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogTailMetadata")
            .field("checkpoint", &self.checkpoint)
            .field("entry_found", &self.entry_found)
            .field("last_transaction_id", &self.last_transaction_id)
            .field("lowest_version_unknown", &self.lowest_version_unknown)
            .field("lowest_log_version", &self.lowest_log_version)
            .field("highest_log_version", &self.highest_log_version)
            .field("entry_kernel_version", &self.entry_kernel_version)
            .field("store_id", &self.store_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_metadata() -> LogTailMetadata {
        LogTailMetadata {
            checkpoint: None,
            entry_found: false,
            last_transaction_id: None,
            lowest_version_unknown: false,
            lowest_log_version: None,
            highest_log_version: None,
            entry_kernel_version: None,
            store_id: None,
            fallback_kernel_version: Arc::new(LatestKernelVersion),
        }
    }

    #[test]
    fn kernel_version_falls_back_to_provider() {
        let tail = empty_metadata();
        assert_eq!(tail.kernel_version(), KernelVersion::LATEST);
    }

    #[test]
    fn kernel_version_prefers_the_entry() {
        let mut tail = empty_metadata();
        tail.entry_kernel_version = Some(KernelVersion::V1);
        assert_eq!(tail.kernel_version(), KernelVersion::V1);
    }

    #[test]
    fn unknown_lowest_version_hides_the_value() {
        let mut tail = empty_metadata();
        tail.lowest_log_version = Some(3);
        tail.lowest_version_unknown = true;
        assert_eq!(tail.lowest_log_version(), None);
    }
}
