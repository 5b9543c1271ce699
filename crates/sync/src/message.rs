//! Sync protocol envelopes.
//!
//! Four dispatcher-level envelope kinds flow over the wire: inventory
//! requests and responses for discovery, data requests and responses for
//! fetch. Hashes embedded in text-oriented fields (inventory entries,
//! start/end hashes) travel as 0x-prefixed lowercase hex.

use meridian_types::{ChannelId, Hash, PeerId};
use serde::{Deserialize, Serialize};

/// "Give me hashes on this channel, starting from the first of `starts`
/// we share, up to `end`."
///
/// `starts` lists candidate common ancestors in descending preference;
/// an empty `end` means "no upper bound".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRequest {
    /// Channel the inventory is about.
    pub channel_id: ChannelId,
    /// Candidate common ancestors, hex-encoded, best first.
    pub starts: Vec<String>,
    /// Hex-encoded upper bound, or the empty hash for none.
    pub end: String,
}

/// Advertised hashes, ordered, bounded by the inventory size cap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryResponse {
    /// Channel the inventory is about.
    pub channel_id: ChannelId,
    /// Hex-encoded advertised hashes.
    pub entries: Vec<String>,
}

/// "Fetch these payloads."
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    /// Channel the payloads belong to.
    pub channel_id: ChannelId,
    /// Hex-encoded hashes to fetch.
    pub entries: Vec<String>,
}

/// One payload per message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataResponse {
    /// Channel the payload belongs to.
    pub channel_id: ChannelId,
    /// Encoded block, vote or proposal.
    pub payload: Vec<u8>,
}

/// Tagged union of the four envelope kinds.
///
/// The discriminant lets a receiver parse an envelope without out-of-band
/// channel knowledge; dispatch is an exhaustive match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// Inventory request envelope.
    InventoryRequest(InventoryRequest),
    /// Inventory response envelope.
    InventoryResponse(InventoryResponse),
    /// Data request envelope.
    DataRequest(DataRequest),
    /// Data response envelope.
    DataResponse(DataResponse),
}

impl SyncMessage {
    /// Envelope kind name for logging.
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::InventoryRequest(_) => "InventoryRequest",
            Self::InventoryResponse(_) => "InventoryResponse",
            Self::DataRequest(_) => "DataRequest",
            Self::DataResponse(_) => "DataResponse",
        }
    }

    /// The channel the envelope is about.
    pub fn channel_id(&self) -> ChannelId {
        match self {
            Self::InventoryRequest(req) => req.channel_id,
            Self::InventoryResponse(resp) => resp.channel_id,
            Self::DataRequest(req) => req.channel_id,
            Self::DataResponse(resp) => resp.channel_id,
        }
    }
}

/// A parsed inbound message with its transport context.
#[derive(Clone, Debug)]
pub struct Message {
    /// Peer that sent the message.
    pub peer_id: PeerId,
    /// Transport channel it arrived on.
    pub channel_id: ChannelId,
    /// The decoded envelope.
    pub content: SyncMessage,
}

/// Hex-encode hashes for a text-oriented envelope field.
pub fn hashes_to_hex(hashes: &[Hash]) -> Vec<String> {
    hashes.iter().map(Hash::to_hex).collect()
}
