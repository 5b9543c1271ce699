//! Wire codec for envelopes and consensus payloads.
//!
//! bincode gives a deterministic, length-prefixed binary encoding of the
//! recursively-defined records; the [`SyncMessage`](crate::SyncMessage)
//! enum discriminant tags each envelope so a receiver can parse without
//! out-of-band channel knowledge.

use crate::error::{Result, SyncError};
use crate::message::SyncMessage;
use meridian_types::{Block, Proposal, Vote};
use serde::de::DeserializeOwned;
use serde::Serialize;

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| SyncError::encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| SyncError::decode(e.to_string()))
}

/// Encode an envelope for the wire.
pub fn encode_message(message: &SyncMessage) -> Result<Vec<u8>> {
    encode(message)
}

/// Decode a wire envelope.
pub fn decode_message(bytes: &[u8]) -> Result<SyncMessage> {
    decode(bytes)
}

/// Encode a block payload.
pub fn encode_block(block: &Block) -> Result<Vec<u8>> {
    encode(block)
}

/// Decode a block payload.
pub fn decode_block(bytes: &[u8]) -> Result<Block> {
    decode(bytes)
}

/// Encode a vote payload.
pub fn encode_vote(vote: &Vote) -> Result<Vec<u8>> {
    encode(vote)
}

/// Decode a vote payload.
pub fn decode_vote(bytes: &[u8]) -> Result<Vote> {
    decode(bytes)
}

/// Encode a proposal payload.
pub fn encode_proposal(proposal: &Proposal) -> Result<Vec<u8>> {
    encode(proposal)
}

/// Decode a proposal payload.
pub fn decode_proposal(bytes: &[u8]) -> Result<Proposal> {
    decode(bytes)
}
