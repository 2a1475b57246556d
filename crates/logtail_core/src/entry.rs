//! Log entry types and serialization.
//!
//! Entries are framed as `type byte | payload | crc32`, little-endian
//! throughout, with the checksum covering the type byte and payload. A
//! type byte of zero is never a valid entry: zeros mark pre-allocated
//! file space and end the readable region.

use crate::error::{TailError, TailResult};
use crate::types::{KernelVersion, TransactionId};

/// Size of the trailing checksum.
pub const CRC_SIZE: usize = 4;

/// Type of log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryKind {
    /// A transaction started.
    Start = 1,
    /// A transaction committed.
    Commit = 2,
    /// A chunk of a large transaction ended.
    ChunkEnd = 3,
    /// An opaque command payload. Ignored by the tail scan.
    Command = 4,
}

impl EntryKind {
    /// Converts a wire byte to an entry kind.
    ///
    /// Zero is not a kind: it marks pre-allocated space.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Start),
            2 => Some(Self::Commit),
            3 => Some(Self::ChunkEnd),
            4 => Some(Self::Command),
            _ => None,
        }
    }

    /// Converts the entry kind to its wire byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Payload size for fixed-size kinds. `Command` payloads are
    /// length-prefixed and have no fixed size.
    #[must_use]
    pub const fn fixed_payload_len(self) -> Option<usize> {
        match self {
            Self::Start => Some(1 + 8),
            Self::Commit => Some(8 + 4),
            Self::ChunkEnd => Some(8 + 8 + 4),
            Self::Command => None,
        }
    }
}

/// A single decoded log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// A transaction started.
    Start {
        /// Kernel format version the transaction was written under.
        kernel_version: KernelVersion,
        /// Wall-clock milliseconds when the entry was written.
        time_written: u64,
    },

    /// A transaction committed.
    Commit {
        /// The committed transaction.
        transaction_id: TransactionId,
        /// Checksum over the transaction's entries.
        checksum: u32,
    },

    /// A chunk of a large transaction ended.
    ChunkEnd {
        /// The transaction the chunk belongs to.
        transaction_id: TransactionId,
        /// Position of the chunk within the transaction.
        chunk_id: u64,
        /// Checksum over the chunk's entries.
        checksum: u32,
    },

    /// An opaque command payload, replayed by the storage engine but
    /// irrelevant to tail determination.
    Command {
        /// Serialized command bytes.
        payload: Vec<u8>,
    },
}

impl LogEntry {
    /// Returns the entry kind.
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Start { .. } => EntryKind::Start,
            Self::Commit { .. } => EntryKind::Commit,
            Self::ChunkEnd { .. } => EntryKind::ChunkEnd,
            Self::Command { .. } => EntryKind::Command,
        }
    }

    /// Serializes the full framed entry: type byte, payload, checksum.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(self.kind().as_byte());

        match self {
            Self::Start {
                kernel_version,
                time_written,
            } => {
                buf.push(kernel_version.as_byte());
                buf.extend_from_slice(&time_written.to_le_bytes());
            }
            Self::Commit {
                transaction_id,
                checksum,
            } => {
                buf.extend_from_slice(&transaction_id.as_u64().to_le_bytes());
                buf.extend_from_slice(&checksum.to_le_bytes());
            }
            Self::ChunkEnd {
                transaction_id,
                chunk_id,
                checksum,
            } => {
                buf.extend_from_slice(&transaction_id.as_u64().to_le_bytes());
                buf.extend_from_slice(&chunk_id.to_le_bytes());
                buf.extend_from_slice(&checksum.to_le_bytes());
            }
            Self::Command { payload } => {
                buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
                buf.extend_from_slice(payload);
            }
        }

        let crc = compute_crc32(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Deserializes an entry from its kind and payload bytes.
    ///
    /// The payload excludes the type byte and checksum; the caller has
    /// already verified the checksum and supplies file context on error.
    pub(crate) fn decode_payload(
        log_version: u64,
        kind: EntryKind,
        payload: &[u8],
    ) -> TailResult<Self> {
        let truncated =
            || TailError::entry_corruption(log_version, format!("truncated {kind:?} payload"));

        let read_u64 = |at: usize| -> TailResult<u64> {
            let bytes: [u8; 8] = payload
                .get(at..at + 8)
                .ok_or_else(truncated)?
                .try_into()
                .map_err(|_| truncated())?;
            Ok(u64::from_le_bytes(bytes))
        };
        let read_u32 = |at: usize| -> TailResult<u32> {
            let bytes: [u8; 4] = payload
                .get(at..at + 4)
                .ok_or_else(truncated)?
                .try_into()
                .map_err(|_| truncated())?;
            Ok(u32::from_le_bytes(bytes))
        };

        match kind {
            EntryKind::Start => Ok(Self::Start {
                kernel_version: KernelVersion::new(*payload.first().ok_or_else(truncated)?),
                time_written: read_u64(1)?,
            }),
            EntryKind::Commit => Ok(Self::Commit {
                transaction_id: TransactionId::new(read_u64(0)?),
                checksum: read_u32(8)?,
            }),
            EntryKind::ChunkEnd => Ok(Self::ChunkEnd {
                transaction_id: TransactionId::new(read_u64(0)?),
                chunk_id: read_u64(8)?,
                checksum: read_u32(16)?,
            }),
            EntryKind::Command => {
                let len = read_u32(0)? as usize;
                let bytes = payload.get(4..4 + len).ok_or_else(truncated)?;
                Ok(Self::Command {
                    payload: bytes.to_vec(),
                })
            }
        }
    }
}

/// Computes the CRC32 checksum (IEEE polynomial) of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_framed(bytes: &[u8]) -> LogEntry {
        let kind = EntryKind::from_byte(bytes[0]).unwrap();
        let payload = &bytes[1..bytes.len() - CRC_SIZE];
        LogEntry::decode_payload(0, kind, payload).unwrap()
    }

    #[test]
    fn kind_roundtrip() {
        for kind in [
            EntryKind::Start,
            EntryKind::Commit,
            EntryKind::ChunkEnd,
            EntryKind::Command,
        ] {
            assert_eq!(EntryKind::from_byte(kind.as_byte()), Some(kind));
        }
        assert_eq!(EntryKind::from_byte(0), None);
        assert_eq!(EntryKind::from_byte(0xFF), None);
    }

    #[test]
    fn start_entry_roundtrip() {
        let entry = LogEntry::Start {
            kernel_version: KernelVersion::V1,
            time_written: 1_700_000_000_000,
        };
        assert_eq!(decode_framed(&entry.encode()), entry);
    }

    #[test]
    fn chunk_end_entry_roundtrip() {
        let entry = LogEntry::ChunkEnd {
            transaction_id: TransactionId::new(42),
            chunk_id: 3,
            checksum: 0xDEAD_BEEF,
        };
        assert_eq!(decode_framed(&entry.encode()), entry);
    }

    #[test]
    fn command_entry_roundtrip() {
        let entry = LogEntry::Command {
            payload: vec![9, 8, 7, 6],
        };
        assert_eq!(decode_framed(&entry.encode()), entry);
    }

    #[test]
    fn framed_checksum_matches() {
        let bytes = LogEntry::Commit {
            transaction_id: TransactionId::new(1),
            checksum: 0,
        }
        .encode();
        let body = &bytes[..bytes.len() - CRC_SIZE];
        let stored = u32::from_le_bytes(bytes[bytes.len() - CRC_SIZE..].try_into().unwrap());
        assert_eq!(compute_crc32(body), stored);
    }

    #[test]
    fn truncated_payload_rejected() {
        let result = LogEntry::decode_payload(5, EntryKind::Commit, &[1, 2, 3]);
        assert!(matches!(
            result,
            Err(TailError::EntryCorruption { version: 5, .. })
        ));
    }

    #[test]
    fn crc32_known_value() {
        // Known test vector: "123456789" should give 0xCBF43926
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
    }
}
