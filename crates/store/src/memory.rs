//! In-memory implementation of [`BlockStore`].
//!
//! Primarily for tests and local development. All block-tree state lives
//! under a single lock so parent/child links and statuses always change
//! atomically; data is cloned out before returning to keep lock hold times
//! short.

use crate::error::{Result, StoreError};
use crate::store::{BlockStore, ExtendedBlock};
use meridian_types::{Block, BlockStatus, Hash, Vote, VoteSet};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Block-tree state grouped under one lock.
struct TreeState {
    blocks: HashMap<Hash, ExtendedBlock>,
    votes: HashMap<Hash, VoteSet>,
}

impl TreeState {
    fn new() -> Self {
        Self {
            blocks: HashMap::new(),
            votes: HashMap::new(),
        }
    }
}

/// In-memory block store.
pub struct MemoryStore {
    state: RwLock<TreeState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TreeState::new()),
        }
    }

    /// Create a store seeded with a finalized genesis root.
    pub fn with_genesis(genesis: Block) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write();
            state.blocks.insert(
                genesis.hash,
                ExtendedBlock {
                    block: genesis,
                    status: BlockStatus::Finalized,
                    children: Vec::new(),
                },
            );
        }
        store
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.state.read().blocks.len()
    }

    /// True when no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.state.read().blocks.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for MemoryStore {
    fn find_block(&self, hash: &Hash) -> Option<ExtendedBlock> {
        self.state.read().blocks.get(hash).cloned()
    }

    fn add_block(&self, block: Block) -> Result<ExtendedBlock> {
        if block.hash.is_empty() {
            return Err(StoreError::EmptyHash);
        }

        let mut state = self.state.write();

        if let Some(existing) = state.blocks.get(&block.hash) {
            if existing.block.parent != block.parent {
                return Err(StoreError::ParentMismatch {
                    hash: block.hash,
                    stored: existing.block.parent,
                    given: block.parent,
                });
            }
            return Ok(existing.clone());
        }

        let parent_valid = if block.parent.is_empty() {
            // Genesis root: no parent to connect to.
            true
        } else {
            state
                .blocks
                .get(&block.parent)
                .is_some_and(|p| p.status.is_valid())
        };

        let status = if parent_valid {
            BlockStatus::Valid
        } else {
            BlockStatus::Pending
        };

        let hash = block.hash;
        let parent = block.parent;
        let extended = ExtendedBlock {
            block,
            status,
            children: Vec::new(),
        };
        state.blocks.insert(hash, extended.clone());

        if let Some(parent_entry) = state.blocks.get_mut(&parent) {
            if !parent_entry.children.contains(&hash) {
                parent_entry.children.push(hash);
            }
        }

        Ok(extended)
    }

    fn set_status(&self, hash: &Hash, status: BlockStatus) -> Result<()> {
        let mut state = self.state.write();
        let entry = state
            .blocks
            .get_mut(hash)
            .ok_or(StoreError::BlockNotFound(*hash))?;
        entry.status = status;
        Ok(())
    }

    fn find_votes_by_hash(&self, block_hash: &Hash) -> VoteSet {
        self.state
            .read()
            .votes
            .get(block_hash)
            .cloned()
            .unwrap_or_default()
    }

    fn add_vote(&self, vote: Vote) {
        self.state
            .write()
            .votes
            .entry(vote.block_hash)
            .or_default()
            .add(vote);
    }

    fn tips(&self) -> Vec<Hash> {
        let state = self.state.read();
        let mut leaves: Vec<&ExtendedBlock> = state
            .blocks
            .values()
            .filter(|b| b.children.is_empty() && !b.status.is_pending())
            .collect();
        leaves.sort_by(|a, b| b.height().cmp(&a.height()));
        leaves.iter().map(|b| b.hash()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(store: &MemoryStore, parent: Hash, height: u64, tag: u8) -> Block {
        let block = Block::new(parent, height, vec![tag]);
        store.add_block(block.clone()).expect("add");
        block
    }

    #[test]
    fn test_genesis_is_finalized() {
        let genesis = Block::genesis(vec![]);
        let store = MemoryStore::with_genesis(genesis.clone());
        let stored = store.find_block(&genesis.hash).expect("present");
        assert_eq!(stored.status, BlockStatus::Finalized);
        assert!(stored.children.is_empty());
    }

    #[test]
    fn test_add_block_links_child() {
        let genesis = Block::genesis(vec![]);
        let store = MemoryStore::with_genesis(genesis.clone());
        let child = chain(&store, genesis.hash, 1, 1);

        let stored_child = store.find_block(&child.hash).expect("present");
        assert_eq!(stored_child.status, BlockStatus::Valid);

        let stored_genesis = store.find_block(&genesis.hash).expect("present");
        assert_eq!(stored_genesis.children, vec![child.hash]);
    }

    #[test]
    fn test_orphan_is_pending() {
        let store = MemoryStore::new();
        let orphan = Block::new(Hash::compute(b"missing parent"), 5, vec![]);
        let stored = store.add_block(orphan).expect("add");
        assert_eq!(stored.status, BlockStatus::Pending);
    }

    #[test]
    fn test_add_block_is_idempotent() {
        let genesis = Block::genesis(vec![]);
        let store = MemoryStore::with_genesis(genesis.clone());
        let child = chain(&store, genesis.hash, 1, 1);
        store.set_status(&child.hash, BlockStatus::Finalized).expect("set");

        // Re-adding must not reset the status.
        let again = store.add_block(child.clone()).expect("re-add");
        assert_eq!(again.status, BlockStatus::Finalized);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_rejects_empty_hash() {
        let store = MemoryStore::new();
        let mut block = Block::genesis(vec![]);
        block.hash = Hash::EMPTY;
        assert!(matches!(
            store.add_block(block),
            Err(StoreError::EmptyHash)
        ));
    }

    #[test]
    fn test_vote_storage_dedup() {
        let store = MemoryStore::new();
        let block_hash = Hash::compute(b"b");
        let vote = Vote {
            block_hash,
            voter: "v1".to_string(),
            epoch: 1,
            height: 1,
            signature: vec![1],
        };
        store.add_vote(vote.clone());
        store.add_vote(vote.clone());
        assert_eq!(store.find_votes_by_hash(&block_hash).len(), 1);

        let mut other = vote;
        other.voter = "v2".to_string();
        store.add_vote(other);
        assert_eq!(store.find_votes_by_hash(&block_hash).len(), 2);
    }

    #[test]
    fn test_tips_are_leaves_highest_first() {
        let genesis = Block::genesis(vec![]);
        let store = MemoryStore::with_genesis(genesis.clone());
        let a = chain(&store, genesis.hash, 1, 1);
        let b = chain(&store, a.hash, 2, 2);
        let fork = chain(&store, genesis.hash, 1, 3);

        let tips = store.tips();
        assert_eq!(tips.len(), 2);
        assert_eq!(tips[0], b.hash);
        assert_eq!(tips[1], fork.hash);
    }
}
