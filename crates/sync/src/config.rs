//! Sync configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inbound queue capacity.
pub const DEFAULT_MESSAGE_QUEUE_SIZE: usize = 4096;

/// Cap on inventory response entries.
pub const DEFAULT_MAX_INVENTORY_SIZE: usize = 100;

/// Batch size per data request.
pub const DEFAULT_MAX_BLOCKS_PER_REQUEST: usize = 50;

/// Outstanding fetches allowed per peer.
pub const DEFAULT_MAX_PENDING_PER_PEER: usize = 10;

/// Tick period in milliseconds.
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 1000;

/// Per-hash re-request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Fetch attempts before giving up on a hash.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Hard cap on buffered orphan blocks.
pub const DEFAULT_MAX_ORPHANS: usize = 2048;

/// Sync configuration.
///
/// Read from the process-wide configuration of the integrating binary; all
/// fields default to the values above when absent.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Inbound message queue capacity.
    pub message_queue_size: usize,
    /// Maximum entries per inventory response.
    pub max_inventory_size: usize,
    /// Maximum hashes per data request batch.
    pub max_blocks_per_request: usize,
    /// Maximum outstanding data requests per peer.
    pub max_pending_per_peer: usize,
    /// Request manager tick period (ms).
    pub request_interval_ms: u64,
    /// Per-hash re-request timeout (ms).
    pub request_timeout_ms: u64,
    /// Fetch attempts before a hash is dropped.
    pub max_attempts: u32,
    /// Hard cap on buffered orphan blocks; oldest are evicted beyond it.
    pub max_orphans: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            message_queue_size: DEFAULT_MESSAGE_QUEUE_SIZE,
            max_inventory_size: DEFAULT_MAX_INVENTORY_SIZE,
            max_blocks_per_request: DEFAULT_MAX_BLOCKS_PER_REQUEST,
            max_pending_per_peer: DEFAULT_MAX_PENDING_PER_PEER,
            request_interval_ms: DEFAULT_REQUEST_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_orphans: DEFAULT_MAX_ORPHANS,
        }
    }
}

impl SyncConfig {
    /// Tick period as a [`Duration`].
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    /// Re-request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
