//! Block synchronization for meridian.
//!
//! The sync layer sits between the p2p network and the consensus engine.
//! It keeps the local block tree eventually consistent with the network by
//! discovering, requesting, buffering and delivering blocks, votes and
//! proposals while absorbing the disorder of gossip: duplicates,
//! out-of-order arrivals, and orphans whose parents have not been seen.
//!
//! Two cooperating components:
//!
//! - [`SyncManager`], the message pump: owns the single bounded inbound
//!   queue, dispatches inventory and data traffic, answers peers' catch-up
//!   queries from the local chain, and routes consensus payloads onward.
//! - [`RequestManager`], the orphan buffer and fetch scheduler: tracks
//!   hashes known to the network but missing locally, fetches them with
//!   bounded parallelism and retry, and releases blocks to the consensus
//!   engine strictly parent-before-child.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod consensus;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod metrics;

mod manager;
mod requests;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::SyncConfig;
pub use consensus::{ConsensusEngine, ConsensusMessage, MessageConsumer};
pub use dispatcher::{Dispatcher, RequestSender};
pub use error::{Result, SyncError};
pub use manager::{MessageHandler, SyncManager};
pub use message::{
    DataRequest, DataResponse, InventoryRequest, InventoryResponse, Message, SyncMessage,
};
pub use requests::RequestManager;
