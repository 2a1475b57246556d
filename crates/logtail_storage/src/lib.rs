//! # Logtail Storage
//!
//! Versioned log store abstraction for logtail.
//!
//! This crate provides the lowest-level storage abstraction the tail
//! recovery code runs against. A log store is a collection of numbered
//! files, keyed by `(LogKind, version)`. Stores are **opaque byte
//! stores** - they do not interpret headers, entries, or checkpoint
//! records. All format interpretation lives in `logtail_core`.
//!
//! ## Design Principles
//!
//! - Channels are simple byte stores (read, append, flush, truncate)
//! - Version discovery comes from the store, not from file contents
//! - Stores and channels must be `Send + Sync` where shared
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and ephemeral logs
//! - [`FileStore`] - For persistent logs using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use logtail_storage::{LogKind, LogStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let mut channel = store.create(LogKind::Transaction, 0).unwrap();
//! channel.append(b"hello").unwrap();
//! assert_eq!(store.size(LogKind::Transaction, 0).unwrap(), 5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{LogChannel, LogKind, LogStore};
