//! Block type and its store-side status.

use crate::Hash;
use serde::{Deserialize, Serialize};

/// A blockchain block as seen by the sync layer.
///
/// The payload is opaque here: transaction contents, state roots and
/// signatures are the concern of the ledger and consensus layers. The sync
/// layer only needs the identity, the parent link and the height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block hash (identity).
    pub hash: Hash,
    /// Parent block hash; `Hash::EMPTY` only for the genesis root.
    pub parent: Hash,
    /// Height, monotonic from genesis.
    pub height: u64,
    /// Opaque block body.
    pub payload: Vec<u8>,
}

impl Block {
    /// Create a block, deriving its hash from parent, height and payload.
    pub fn new(parent: Hash, height: u64, payload: Vec<u8>) -> Self {
        let mut preimage = Vec::with_capacity(32 + 8 + payload.len());
        preimage.extend_from_slice(parent.as_bytes());
        preimage.extend_from_slice(&height.to_be_bytes());
        preimage.extend_from_slice(&payload);
        Self {
            hash: Hash::compute(&preimage),
            parent,
            height,
            payload,
        }
    }

    /// Create a genesis root block at height 0 with no parent.
    pub fn genesis(payload: Vec<u8>) -> Self {
        Self::new(Hash::EMPTY, 0, payload)
    }
}

/// Validation status of a block inside the store.
///
/// A block with a status other than `Pending` has every ancestor present
/// in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    /// Received but its ancestry is not yet fully connected.
    Pending,
    /// Connected to a valid ancestry.
    Valid,
    /// Irreversibly committed by consensus.
    Finalized,
    /// Rejected; kept only so we do not re-fetch it.
    Invalid,
}

impl BlockStatus {
    /// True while the block's ancestry is incomplete.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// True once consensus has committed the block.
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized)
    }

    /// True for blocks safe to build on.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid | Self::Finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_hash_derivation() {
        let genesis = Block::genesis(vec![]);
        let a = Block::new(genesis.hash, 1, vec![1, 2, 3]);
        let b = Block::new(genesis.hash, 1, vec![1, 2, 3]);
        assert_eq!(a.hash, b.hash);

        let c = Block::new(genesis.hash, 1, vec![9]);
        assert_ne!(a.hash, c.hash);
    }

    #[test]
    fn test_genesis_has_empty_parent() {
        let genesis = Block::genesis(b"chain-id".to_vec());
        assert!(genesis.parent.is_empty());
        assert_eq!(genesis.height, 0);
        assert!(!genesis.hash.is_empty());
    }

    #[test]
    fn test_status_predicates() {
        assert!(BlockStatus::Pending.is_pending());
        assert!(!BlockStatus::Valid.is_pending());
        assert!(BlockStatus::Finalized.is_finalized());
        assert!(BlockStatus::Valid.is_valid());
        assert!(BlockStatus::Finalized.is_valid());
        assert!(!BlockStatus::Invalid.is_valid());
        assert!(!BlockStatus::Pending.is_valid());
    }
}
