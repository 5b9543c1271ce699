//! Block store trait.

use crate::error::Result;
use meridian_types::{Block, BlockStatus, Hash, Vote, VoteSet};

/// A block as the store knows it: the block itself plus the tree links and
/// validation status the store maintains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedBlock {
    /// The stored block.
    pub block: Block,
    /// Validation status.
    pub status: BlockStatus,
    /// Hashes of known children, in insertion order.
    pub children: Vec<Hash>,
}

impl ExtendedBlock {
    /// Hash of the underlying block.
    pub fn hash(&self) -> Hash {
        self.block.hash
    }

    /// Height of the underlying block.
    pub fn height(&self) -> u64 {
        self.block.height
    }
}

/// Contract the sync layer consumes from the local block tree.
///
/// Implementations must be thread-safe; the sync layer consults the store
/// from both its main loop and the request manager tick. Operations are
/// synchronous and must not block on I/O: the request manager calls them
/// while holding its state lock.
pub trait BlockStore: Send + Sync {
    /// Look up a block by hash.
    fn find_block(&self, hash: &Hash) -> Option<ExtendedBlock>;

    /// Insert a block, linking it under its parent.
    ///
    /// Idempotent: re-adding a known block returns the stored entry
    /// unchanged. A newly inserted block becomes `Valid` when its parent is
    /// `Valid` or `Finalized` (or when it is the genesis root), `Pending`
    /// otherwise.
    fn add_block(&self, block: Block) -> Result<ExtendedBlock>;

    /// Overwrite the status of a stored block.
    fn set_status(&self, hash: &Hash, status: BlockStatus) -> Result<()>;

    /// Votes known for the given block hash.
    fn find_votes_by_hash(&self, block_hash: &Hash) -> VoteSet;

    /// Record a vote (deduplicated by vote identity).
    fn add_vote(&self, vote: Vote);

    /// Hashes of the current leaf blocks, highest first. Used by the sync
    /// layer as the `starts` of catch-up inventory requests.
    fn tips(&self) -> Vec<Hash>;
}
