//! Core types for the meridian node.
//!
//! This crate provides the fundamental data structures shared by the sync
//! layer, the block store, and the consensus engine: hashes, blocks, votes,
//! proposals, and the logical channel identifiers of the p2p transport.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod block;
pub mod channel;
pub mod hash;
pub mod proposal;
pub mod vote;

pub use block::{Block, BlockStatus};
pub use channel::ChannelId;
pub use hash::Hash;
pub use proposal::Proposal;
pub use vote::{Vote, VoteSet};

/// Network identity of a peer, as handed to us by the transport layer.
pub type PeerId = String;

/// Identity of a validator as it appears in votes.
pub type ValidatorId = String;
