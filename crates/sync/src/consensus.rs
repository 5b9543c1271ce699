//! Seams toward the consensus engine.

use meridian_store::ExtendedBlock;
use meridian_types::{Block, Proposal, Vote};

/// What the sync layer needs to know from the consensus engine.
pub trait ConsensusEngine: Send + Sync {
    /// Identity of this node, used in log context.
    fn id(&self) -> String;

    /// The block with the greatest height whose status is `Finalized`.
    fn last_finalized_block(&self) -> ExtendedBlock;
}

/// A consensus-bearing payload handed down to the engine's message queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusMessage {
    /// A block whose parent is already known valid locally.
    Block(Block),
    /// A deduplicated vote.
    Vote(Vote),
    /// A proposal (delivered after its contained votes).
    Proposal(Proposal),
}

/// Sink for consensus-bearing payloads.
///
/// `add_message` must not block indefinitely: the sync layer calls it from
/// its delivery path and pauses (rather than drops) if the consumer stalls.
pub trait MessageConsumer: Send + Sync {
    /// Accept a payload.
    fn add_message(&self, message: ConsensusMessage);
}
