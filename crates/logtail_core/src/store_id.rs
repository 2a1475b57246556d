//! Store identity and upgrade lineage.

use std::fmt;
use uuid::Uuid;

/// Identity token for a storage instance.
///
/// A store id pairs a random identity with an upgrade generation. A
/// store upgraded in place keeps its identity and bumps the generation,
/// so log files written before the upgrade remain recognizable as
/// belonging to the same lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId {
    id: Uuid,
    generation: u64,
}

impl StoreId {
    /// Encoded size in bytes: uuid (16) + generation (8).
    pub const ENCODED_LEN: usize = 24;

    /// Creates a store id from its parts.
    #[must_use]
    pub const fn new(id: Uuid, generation: u64) -> Self {
        Self { id, generation }
    }

    /// Creates a fresh identity at generation zero.
    #[must_use]
    pub fn random() -> Self {
        Self {
            id: Uuid::new_v4(),
            generation: 0,
        }
    }

    /// Returns the identity this store was created with.
    #[must_use]
    pub const fn id(self) -> Uuid {
        self.id
    }

    /// Returns the upgrade generation.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }

    /// Returns the id this store would carry after an in-place upgrade.
    #[must_use]
    pub const fn upgrade_successor(self) -> Self {
        Self {
            id: self.id,
            generation: self.generation + 1,
        }
    }

    /// Returns true if `other` is the same store or a later generation
    /// of the same upgrade lineage.
    ///
    /// This predicate is directional: a generation-2 store is a
    /// successor of its generation-1 ancestor, not the other way around.
    #[must_use]
    pub fn is_same_or_upgrade_successor(self, other: Self) -> bool {
        self.id == other.id && other.generation >= self.generation
    }

    /// Symmetric compatibility: either side is a same-or-successor of
    /// the other.
    #[must_use]
    pub fn is_compatible_with(self, other: Self) -> bool {
        self.is_same_or_upgrade_successor(other) || other.is_same_or_upgrade_successor(self)
    }

    /// Encodes the store id into its 24-byte wire form.
    #[must_use]
    pub fn encode(self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        buf[..16].copy_from_slice(self.id.as_bytes());
        buf[16..].copy_from_slice(&self.generation.to_le_bytes());
        buf
    }

    /// Decodes a store id from its 24-byte wire form.
    #[must_use]
    pub fn decode(bytes: &[u8; Self::ENCODED_LEN]) -> Self {
        let mut id = [0u8; 16];
        id.copy_from_slice(&bytes[..16]);
        let mut generation = [0u8; 8];
        generation.copy_from_slice(&bytes[16..]);
        Self {
            id: Uuid::from_bytes(id),
            generation: u64::from_le_bytes(generation),
        }
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store:{}#{}", self.id, self.generation)
    }
}
