//! Vote types.

use crate::{Hash, ValidatorId};
use serde::{Deserialize, Serialize};

/// A vote from a validator for a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Block hash being voted for.
    pub block_hash: Hash,
    /// Voting validator.
    pub voter: ValidatorId,
    /// Consensus epoch.
    pub epoch: u64,
    /// Block height.
    pub height: u64,
    /// Vote signature, opaque to the sync layer.
    pub signature: Vec<u8>,
}

impl Vote {
    /// Identity comparison: two votes are the same vote iff block hash,
    /// voter, epoch and height all match. Signatures do not participate.
    pub fn same_vote(&self, other: &Vote) -> bool {
        self.block_hash == other.block_hash
            && self.voter == other.voter
            && self.epoch == other.epoch
            && self.height == other.height
    }
}

/// An unordered collection of votes, deduplicated by vote identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSet {
    votes: Vec<Vote>,
}

impl VoteSet {
    /// Create an empty vote set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vote; duplicates (by identity) are ignored.
    pub fn add(&mut self, vote: Vote) {
        if !self.contains(&vote) {
            self.votes.push(vote);
        }
    }

    /// True if a vote with the same identity is already present.
    pub fn contains(&self, vote: &Vote) -> bool {
        self.votes.iter().any(|v| v.same_vote(vote))
    }

    /// The contained votes.
    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    /// Number of votes.
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    /// True when no votes are present.
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}

impl FromIterator<Vote> for VoteSet {
    fn from_iter<I: IntoIterator<Item = Vote>>(iter: I) -> Self {
        let mut set = Self::new();
        for vote in iter {
            set.add(vote);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(voter: &str, epoch: u64) -> Vote {
        Vote {
            block_hash: Hash::compute(b"block"),
            voter: voter.to_string(),
            epoch,
            height: 10,
            signature: vec![0; 64],
        }
    }

    #[test]
    fn test_same_vote_ignores_signature() {
        let a = vote("v1", 5);
        let mut b = vote("v1", 5);
        b.signature = vec![0xff; 64];
        assert!(a.same_vote(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_vote_distinguishes_identity_fields() {
        let a = vote("v1", 5);
        assert!(!a.same_vote(&vote("v2", 5)));
        assert!(!a.same_vote(&vote("v1", 6)));
    }

    #[test]
    fn test_vote_set_dedup() {
        let mut set = VoteSet::new();
        set.add(vote("v1", 5));
        set.add(vote("v1", 5));
        set.add(vote("v2", 5));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&vote("v1", 5)));
    }

    #[test]
    fn test_vote_set_from_iter() {
        let set: VoteSet = vec![vote("v1", 1), vote("v1", 1), vote("v3", 1)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }
}
