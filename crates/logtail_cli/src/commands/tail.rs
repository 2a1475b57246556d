//! Tail command implementation.

use logtail_core::{
    CorruptionMonitor, LatestKernelVersion, LogTailMetadata, TailError, TailScanConfig,
    TailScanner,
};
use logtail_storage::FileStore;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Serializable view of the tail state for `--format json`.
#[derive(Debug, Serialize)]
struct TailSummary {
    entry_found: bool,
    last_transaction_id: Option<u64>,
    kernel_version: u8,
    lowest_log_version: Option<u64>,
    highest_log_version: Option<u64>,
    checkpoint_log_version: Option<u64>,
    checkpoint_byte_offset: Option<u64>,
    store_id: Option<String>,
}

impl TailSummary {
    fn from_metadata(tail: &LogTailMetadata) -> Self {
        let checkpoint = tail.last_checkpoint().map(|c| c.transaction_log_position());
        Self {
            entry_found: tail.entry_found(),
            last_transaction_id: tail.last_transaction_id().map(|id| id.0),
            kernel_version: tail.kernel_version().0,
            lowest_log_version: tail.lowest_log_version(),
            highest_log_version: tail.highest_log_version(),
            checkpoint_log_version: checkpoint.map(|p| p.log_version()),
            checkpoint_byte_offset: checkpoint.map(|p| p.byte_offset()),
            store_id: tail.store_id().map(|id| id.to_string()),
        }
    }
}

/// Monitor that surfaces corruption reports as warnings.
struct WarnMonitor;

impl CorruptionMonitor for WarnMonitor {
    fn corrupted_log_file(&self, log_version: u64, error: &TailError) {
        warn!(log_version, %error, "corruption in transaction log");
    }
}

/// Runs the tail command.
pub fn run(path: &Path, best_effort: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(FileStore::open(path)?);
    let config = TailScanConfig::default().fail_on_corrupted_log_files(!best_effort);
    let scanner = TailScanner::new(
        store,
        config,
        Arc::new(WarnMonitor),
        Arc::new(LatestKernelVersion),
    );
    let tail = scanner.get_tail_metadata()?;

    match format {
        "json" => {
            let summary = TailSummary::from_metadata(&tail);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => print_text(&tail),
    }
    Ok(())
}

fn print_text(tail: &LogTailMetadata) {
    println!("Log tail state");
    println!();
    match tail.last_checkpoint() {
        Some(checkpoint) => println!("Checkpoint:          {checkpoint}"),
        None => println!("Checkpoint:          none"),
    }
    println!("Entry found:         {}", tail.entry_found());
    match tail.last_transaction_id() {
        Some(id) => println!("Last transaction:    {id}"),
        None => println!("Last transaction:    none"),
    }
    println!("Kernel version:      {}", tail.kernel_version());
    match tail.lowest_log_version() {
        Some(version) => println!("Lowest log version:  {version}"),
        None => println!("Lowest log version:  unknown"),
    }
    match tail.highest_log_version() {
        Some(version) => println!("Highest log version: {version}"),
        None => println!("Highest log version: none"),
    }
    match tail.store_id() {
        Some(id) => println!("Store id:            {id}"),
        None => println!("Store id:            none"),
    }
}
