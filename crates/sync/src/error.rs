//! Sync error types

use meridian_store::StoreError;
use meridian_types::{ChannelId, Hash};
use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Sync error categories.
///
/// The sync layer is best-effort and eventually consistent: none of these
/// is fatal. Malformed input is dropped, misses retry on the next tick, and
/// the only way the subsystem stops is cancellation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed inbound payload; the message is dropped.
    #[error("failed to decode message: {reason}")]
    Decode {
        /// What the decoder rejected.
        reason: String,
    },

    /// Outbound object could not be encoded; the message is dropped.
    #[error("failed to encode message: {reason}")]
    Encode {
        /// What the encoder rejected.
        reason: String,
    },

    /// A requested hash was not found while answering a data request.
    #[error("block not found locally: {0}")]
    StoreMiss(Hash),

    /// Inbound queue is full and the caller cannot wait.
    #[error("inbound queue is full")]
    Backpressure,

    /// Well-formed message on a channel this handler does not implement.
    #[error("unsupported channel: {0}")]
    UnsupportedChannel(ChannelId),

    /// Shutdown was signaled; not a failure.
    #[error("shutdown signaled")]
    Shutdown,

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Create a decode error.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Create an encode error.
    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_display() {
        let err = SyncError::decode("truncated envelope");
        assert_eq!(err.to_string(), "failed to decode message: truncated envelope");
    }

    #[test]
    fn test_unsupported_channel_display() {
        let err = SyncError::UnsupportedChannel(ChannelId::CC);
        assert!(err.to_string().contains("cc"));
    }

    #[test]
    fn test_store_miss_display() {
        let hash = Hash::compute(b"gone");
        let err = SyncError::StoreMiss(hash);
        assert!(err.to_string().contains(&hash.to_hex()));
    }
}
