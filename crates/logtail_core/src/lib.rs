//! # Logtail Core
//!
//! Transaction log tail recovery.
//!
//! On startup a database must determine the authoritative tail state of
//! its write-ahead log before replaying anything: the last valid
//! checkpoint, the last readable transaction, and whether the log is
//! corrupt. This crate owns that determination.
//!
//! The entry point is [`TailScanner`], which reconciles three
//! independent failure possibilities - a missing checkpoint, a
//! checkpoint pointing nowhere useful, and a truncated or corrupt log
//! tail - into a single [`LogTailMetadata`] snapshot. The snapshot is
//! computed once per process lifetime and served from a cache
//! afterwards.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use logtail_core::{
//!     LatestKernelVersion, NoOpMonitor, TailScanConfig, TailScanner,
//! };
//! use logtail_storage::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let scanner = TailScanner::new(
//!     store,
//!     TailScanConfig::default(),
//!     Arc::new(NoOpMonitor),
//!     Arc::new(LatestKernelVersion),
//! );
//! let tail = scanner.get_tail_metadata().unwrap();
//! assert!(!tail.entry_found());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checkpoint;
mod cursor;
mod entry;
mod error;
mod files;
mod header;
mod metadata;
mod monitor;
mod reader;
mod scanner;
mod store_id;
mod types;
mod validity;
mod writer;

pub use checkpoint::{CheckpointFile, CheckpointInfo};
pub use cursor::{TailEntries, Terminal};
pub use entry::{compute_crc32, EntryKind, LogEntry};
pub use error::{TailError, TailResult};
pub use files::LogFile;
pub use header::{LogHeader, LOG_HEADER_SIZE};
pub use metadata::{KernelVersionProvider, LatestKernelVersion, LogTailMetadata};
pub use monitor::{CorruptionMonitor, NoOpMonitor};
pub use reader::EntryReader;
pub use scanner::{TailScanConfig, TailScanner};
pub use store_id::StoreId;
pub use types::{KernelVersion, LogPosition, TransactionId};
pub use writer::LogWriter;
