//! Storage error types

use meridian_types::Hash;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Block not found
    #[error("block not found: {0}")]
    BlockNotFound(Hash),

    /// Block identified by the empty hash
    #[error("refusing to store a block with the empty hash")]
    EmptyHash,

    /// Parent link inconsistent with an already stored block
    #[error("parent mismatch for block {hash}: stored {stored}, given {given}")]
    ParentMismatch {
        /// Block whose parent link conflicted
        hash: Hash,
        /// Parent recorded in the store
        stored: Hash,
        /// Parent carried by the incoming block
        given: Hash,
    },
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;
