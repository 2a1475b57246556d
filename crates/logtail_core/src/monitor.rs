//! Corruption reporting hook.

use crate::error::TailError;

/// Receives a callback for every corrupted log file the tail scan
/// swallows in best-effort mode.
///
/// The scan invokes the monitor before deciding whether to continue, so
/// implementations see corruption even when
/// `fail_on_corrupted_log_files` later turns it into a hard error.
pub trait CorruptionMonitor: Send + Sync {
    /// Called once per log version in which corruption was detected.
    fn corrupted_log_file(&self, log_version: u64, error: &TailError);
}

/// A monitor that ignores all reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMonitor;

impl CorruptionMonitor for NoOpMonitor {
    fn corrupted_log_file(&self, _log_version: u64, _error: &TailError) {}
}
