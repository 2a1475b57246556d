//! Checkpoints command implementation.

use logtail_core::CheckpointFile;
use logtail_storage::{FileStore, LogStore};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// One checkpoint row for `--format json`.
#[derive(Debug, Serialize)]
struct CheckpointSummary {
    transaction_log_version: u64,
    transaction_byte_offset: u64,
    checkpoint_log_version: u64,
    checkpoint_byte_offset: u64,
    store_id: String,
}

/// Runs the checkpoints command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(FileStore::open(path)?) as Arc<dyn LogStore>;
    let checkpoints = CheckpointFile::new(store).reachable_checkpoints()?;

    match format {
        "json" => {
            let rows: Vec<CheckpointSummary> = checkpoints
                .iter()
                .map(|c| CheckpointSummary {
                    transaction_log_version: c.transaction_log_position().log_version(),
                    transaction_byte_offset: c.transaction_log_position().byte_offset(),
                    checkpoint_log_version: c.channel_position_after_checkpoint().log_version(),
                    checkpoint_byte_offset: c.channel_position_after_checkpoint().byte_offset(),
                    store_id: c.store_id().to_string(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => {
            if checkpoints.is_empty() {
                println!("No readable checkpoints");
                return Ok(());
            }
            println!("{} readable checkpoint(s), oldest first:", checkpoints.len());
            println!();
            for checkpoint in &checkpoints {
                println!("  {checkpoint}");
            }
        }
    }
    Ok(())
}
