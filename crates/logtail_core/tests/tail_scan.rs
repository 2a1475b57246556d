//! End-to-end tail determination over an in-memory store.

use logtail_core::{
    CheckpointFile, KernelVersion, LatestKernelVersion, LogEntry, LogFile, LogPosition, LogWriter,
    NoOpMonitor, StoreId, TailError, TailScanConfig, TailScanner, TransactionId, LOG_HEADER_SIZE,
};
use logtail_storage::{LogKind, LogStore, MemoryStore};
use proptest::prelude::*;
use std::sync::Arc;

struct Harness {
    store: Arc<MemoryStore>,
    store_id: StoreId,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            store_id: StoreId::random(),
        }
    }

    fn log_file(&self) -> LogFile {
        LogFile::new(
            Arc::clone(&self.store) as Arc<dyn LogStore>,
            LogKind::Transaction,
        )
    }

    fn checkpoint_file(&self) -> CheckpointFile {
        CheckpointFile::new(Arc::clone(&self.store) as Arc<dyn LogStore>)
    }

    fn writer(&self, version: u64) -> LogWriter {
        LogWriter::create(&self.log_file(), version, self.store_id).unwrap()
    }

    fn scanner(&self, fail_on_corrupted: bool) -> TailScanner {
        TailScanner::new(
            Arc::clone(&self.store) as Arc<dyn LogStore>,
            TailScanConfig::default().fail_on_corrupted_log_files(fail_on_corrupted),
            Arc::new(NoOpMonitor),
            Arc::new(LatestKernelVersion),
        )
    }
}

fn start_entry(time: u64) -> LogEntry {
    LogEntry::Start {
        kernel_version: KernelVersion::V1,
        time_written: time,
    }
}

fn commit_entry(id: u64) -> LogEntry {
    LogEntry::Commit {
        transaction_id: TransactionId(id),
        checksum: 0x5EED,
    }
}

#[test]
fn empty_store_yields_empty_tail_with_provider_kernel_version() {
    let h = Harness::new();
    let tail = h.scanner(true).get_tail_metadata().unwrap();

    assert!(!tail.entry_found());
    assert_eq!(tail.last_transaction_id(), None);
    assert_eq!(tail.last_checkpoint(), None);
    assert_eq!(tail.highest_log_version(), None);
    assert_eq!(tail.lowest_log_version(), None);
    assert_eq!(tail.kernel_version(), KernelVersion::LATEST);
}

#[test]
fn transaction_after_valid_checkpoint_is_reported() {
    let h = Harness::new();
    let mut writer = h.writer(0);
    writer.append(&start_entry(1)).unwrap();
    writer.append(&commit_entry(10)).unwrap();
    let after_first = writer.position();
    writer.append(&start_entry(2)).unwrap();
    writer.append(&commit_entry(11)).unwrap();
    writer.flush().unwrap();

    let checkpoint = h
        .checkpoint_file()
        .append_checkpoint(0, after_first, h.store_id)
        .unwrap();

    let tail = h.scanner(true).get_tail_metadata().unwrap();
    assert_eq!(tail.last_checkpoint(), Some(checkpoint));
    assert!(tail.entry_found());
    assert_eq!(tail.last_transaction_id(), Some(TransactionId(11)));
    assert_eq!(tail.kernel_version(), KernelVersion::V1);
    assert_eq!(tail.store_id(), Some(h.store_id));
}

#[test]
fn checkpoint_past_end_of_file_falls_back_to_older_checkpoint() {
    let h = Harness::new();
    let mut writer = h.writer(0);
    writer.append(&start_entry(1)).unwrap();
    let good_position = writer.append(&commit_entry(10)).unwrap();
    writer.flush().unwrap();

    let checkpoints = h.checkpoint_file();
    let older = checkpoints
        .append_checkpoint(0, good_position, h.store_id)
        .unwrap();
    checkpoints
        .append_checkpoint(0, LogPosition::new(0, 1_000_000), h.store_id)
        .unwrap();

    let tail = h.scanner(false).get_tail_metadata().unwrap();
    assert_eq!(tail.last_checkpoint(), Some(older));
    assert!(!tail.entry_found());
}

#[test]
fn checkpoint_past_end_of_file_is_fatal_in_strict_mode() {
    let h = Harness::new();
    let mut writer = h.writer(0);
    writer.append(&commit_entry(10)).unwrap();
    writer.flush().unwrap();

    h.checkpoint_file()
        .append_checkpoint(0, LogPosition::new(0, 1_000_000), h.store_id)
        .unwrap();

    let err = h.scanner(true).get_tail_metadata().unwrap_err();
    assert!(matches!(err, TailError::RecoveryBlocked { .. }));
    let text = err.to_string();
    assert!(text.contains("fail_on_corrupted_log_files"));
}

#[test]
fn tail_metadata_is_computed_once_and_shared() {
    let h = Harness::new();
    let mut writer = h.writer(0);
    writer.append(&start_entry(1)).unwrap();
    writer.append(&commit_entry(10)).unwrap();
    writer.flush().unwrap();

    let scanner = h.scanner(true);
    let first = scanner.get_tail_metadata().unwrap();
    let second = scanner.get_tail_metadata().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn zeroed_preallocation_after_the_tail_is_not_corruption() {
    let h = Harness::new();
    let mut writer = h.writer(0);
    writer.append(&start_entry(1)).unwrap();
    writer.preallocate(16 * 1024).unwrap();
    writer.flush().unwrap();

    let tail = h.scanner(true).get_tail_metadata().unwrap();
    assert!(!tail.entry_found());
    assert_eq!(tail.kernel_version(), KernelVersion::V1);
}

#[test]
fn garbage_after_the_tail_is_fatal_in_strict_mode() {
    let h = Harness::new();
    let mut writer = h.writer(0);
    writer.append(&start_entry(1)).unwrap();
    writer.flush().unwrap();

    let mut channel = h.store.open(LogKind::Transaction, 0).unwrap();
    channel.append(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

    let err = h.scanner(true).get_tail_metadata().unwrap_err();
    assert!(matches!(err, TailError::RecoveryBlocked { .. }));
}

#[test]
fn garbage_after_the_tail_is_flagged_in_best_effort_mode() {
    let h = Harness::new();
    let mut writer = h.writer(0);
    writer.append(&start_entry(1)).unwrap();
    writer.flush().unwrap();

    let mut channel = h.store.open(LogKind::Transaction, 0).unwrap();
    channel.append(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

    let tail = h.scanner(false).get_tail_metadata().unwrap();
    assert!(tail.entry_found());
    assert_eq!(tail.last_transaction_id(), None);
    assert_eq!(tail.lowest_log_version(), None);
}

#[test]
fn unreadable_leftovers_in_an_older_file_are_fatal_in_strict_mode() {
    let h = Harness::new();
    let mut first = h.writer(0);
    first.append(&start_entry(1)).unwrap();
    first.flush().unwrap();
    // a zero type byte stops the reader early, hiding the garbage behind it
    let mut channel = h.store.open(LogKind::Transaction, 0).unwrap();
    channel.append(&[0x00, 0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
    let mut second = h.writer(1);
    second.append(&commit_entry(7)).unwrap();
    second.flush().unwrap();

    let err = h.scanner(true).get_tail_metadata().unwrap_err();
    assert!(matches!(err, TailError::RecoveryBlocked { .. }));

    let tail = h.scanner(false).get_tail_metadata().unwrap();
    assert!(tail.entry_found());
    assert_eq!(tail.last_transaction_id(), None);
}

#[test]
fn foreign_store_id_invalidates_an_otherwise_correct_checkpoint() {
    let h = Harness::new();
    let mut writer = h.writer(0);
    writer.append(&start_entry(1)).unwrap();
    let position = writer.append(&commit_entry(10)).unwrap();
    writer.flush().unwrap();

    h.checkpoint_file()
        .append_checkpoint(0, position, StoreId::random())
        .unwrap();

    let err = h.scanner(true).get_tail_metadata().unwrap_err();
    assert!(matches!(err, TailError::RecoveryBlocked { .. }));

    // best effort: no older checkpoint exists, so scan from the start
    let tail = h.scanner(false).get_tail_metadata().unwrap();
    assert_eq!(tail.last_checkpoint(), None);
    assert!(tail.entry_found());
    assert_eq!(tail.last_transaction_id(), Some(TransactionId(10)));
}

#[test]
fn upgraded_store_id_keeps_the_checkpoint_valid() {
    let h = Harness::new();
    let mut writer = h.writer(0);
    let position = writer.append(&commit_entry(10)).unwrap();
    writer.flush().unwrap();

    let checkpoint = h
        .checkpoint_file()
        .append_checkpoint(0, position, h.store_id.upgrade_successor())
        .unwrap();

    let tail = h.scanner(true).get_tail_metadata().unwrap();
    assert_eq!(tail.last_checkpoint(), Some(checkpoint));
    // the checkpointed identity wins over the one in the log header
    assert_eq!(tail.store_id(), Some(h.store_id.upgrade_successor()));
}

#[test]
fn transaction_spanning_two_log_versions_is_paired() {
    let h = Harness::new();
    let mut first = h.writer(0);
    first.append(&start_entry(1)).unwrap();
    first.flush().unwrap();
    let mut second = h.writer(1);
    second.append(&commit_entry(42)).unwrap();
    second.flush().unwrap();

    let tail = h.scanner(true).get_tail_metadata().unwrap();
    assert!(tail.entry_found());
    assert_eq!(tail.last_transaction_id(), Some(TransactionId(42)));
    assert_eq!(tail.kernel_version(), KernelVersion::V1);
    assert_eq!(tail.highest_log_version(), Some(1));
    assert_eq!(tail.lowest_log_version(), Some(0));
}

#[test]
fn no_checkpoint_scan_starts_at_the_lowest_version() {
    let h = Harness::new();
    let mut old = h.writer(3);
    old.append(&start_entry(1)).unwrap();
    old.flush().unwrap();
    let mut new = h.writer(4);
    new.append(&commit_entry(7)).unwrap();
    new.flush().unwrap();

    let tail = h.scanner(true).get_tail_metadata().unwrap();
    assert_eq!(tail.lowest_log_version(), Some(3));
    assert_eq!(tail.last_transaction_id(), Some(TransactionId(7)));
}

#[test]
fn scan_over_a_real_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(logtail_storage::FileStore::open(dir.path()).unwrap());
    let store_id = StoreId::random();

    let log = LogFile::new(Arc::clone(&store) as Arc<dyn LogStore>, LogKind::Transaction);
    let mut writer = LogWriter::create(&log, 0, store_id).unwrap();
    writer.append(&start_entry(1)).unwrap();
    let position = writer.append(&commit_entry(21)).unwrap();
    writer.flush().unwrap();

    let checkpoint = CheckpointFile::new(Arc::clone(&store) as Arc<dyn LogStore>)
        .append_checkpoint(0, position, store_id)
        .unwrap();

    let scanner = TailScanner::new(
        store as Arc<dyn LogStore>,
        TailScanConfig::default(),
        Arc::new(NoOpMonitor),
        Arc::new(LatestKernelVersion),
    );
    let tail = scanner.get_tail_metadata().unwrap();
    assert_eq!(tail.last_checkpoint(), Some(checkpoint));
    assert!(!tail.entry_found());
    assert_eq!(tail.store_id(), Some(store_id));
}

proptest! {
    // Truncating a healthy log anywhere past its header must never make
    // the best-effort scan fail or panic; it may only shrink what the
    // tail reports.
    #[test]
    fn best_effort_scan_survives_arbitrary_truncation(cut in LOG_HEADER_SIZE..2048u64) {
        let h = Harness::new();
        let mut writer = h.writer(0);
        for id in 0..40u64 {
            writer.append(&start_entry(id)).unwrap();
            writer.append(&LogEntry::Command { payload: vec![id as u8; 16] }).unwrap();
            writer.append(&commit_entry(id)).unwrap();
        }
        writer.flush().unwrap();

        let mut channel = h.store.open(LogKind::Transaction, 0).unwrap();
        let size = channel.size().unwrap();
        channel.truncate(cut.min(size)).unwrap();

        let tail = h.scanner(false).get_tail_metadata().unwrap();
        if let Some(id) = tail.last_transaction_id() {
            prop_assert!(id.0 < 40);
        }
    }
}
