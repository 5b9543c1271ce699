//! Consensus proposal type.

use crate::{Block, VoteSet};
use serde::{Deserialize, Serialize};

/// A block proposal gossiped by a proposer, optionally carrying the votes
/// that justify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// The proposed block.
    pub block: Block,
    /// Votes accompanying the proposal, if any.
    pub votes: Option<VoteSet>,
}

impl Proposal {
    /// Create a proposal without votes.
    pub fn new(block: Block) -> Self {
        Self { block, votes: None }
    }

    /// Create a proposal carrying a vote set.
    pub fn with_votes(block: Block, votes: VoteSet) -> Self {
        Self {
            block,
            votes: Some(votes),
        }
    }
}
