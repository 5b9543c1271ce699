//! Dispatcher seams between the sync layer and the p2p transport.
//!
//! The node's dispatcher owns the actual peer connections; the sync layer
//! only needs the four send primitives. An empty peer slice means
//! broadcast to all connected peers.

use crate::message::{DataRequest, DataResponse, InventoryRequest, InventoryResponse};
use meridian_types::PeerId;
use std::sync::Arc;

/// Outbound primitives the sync layer consumes from the node's dispatcher.
///
/// Sends are fire-and-forget: delivery is best-effort and failures surface
/// as missing responses, handled by the retry machinery.
pub trait Dispatcher: Send + Sync {
    /// Ask peers for an inventory of what they have.
    fn get_inventory(&self, peers: &[PeerId], request: InventoryRequest);

    /// Advertise an inventory to peers.
    fn send_inventory(&self, peers: &[PeerId], response: InventoryResponse);

    /// Ask peers for payloads.
    fn get_data(&self, peers: &[PeerId], request: DataRequest);

    /// Send a payload to peers.
    fn send_data(&self, peers: &[PeerId], response: DataResponse);
}

/// The narrow slice of [`Dispatcher`] the request manager depends on.
///
/// Keeping the fetch scheduler off the full dispatcher breaks the
/// SyncManager ↔ RequestManager reference cycle.
pub trait RequestSender: Send + Sync {
    /// Ask peers for payloads.
    fn get_data(&self, peers: &[PeerId], request: DataRequest);

    /// Ask peers for an inventory of what they have.
    fn get_inventory(&self, peers: &[PeerId], request: InventoryRequest);
}

/// Adapter exposing a [`Dispatcher`] through the [`RequestSender`] capability.
pub(crate) struct SenderAdapter(pub(crate) Arc<dyn Dispatcher>);

impl RequestSender for SenderAdapter {
    fn get_data(&self, peers: &[PeerId], request: DataRequest) {
        self.0.get_data(peers, request);
    }

    fn get_inventory(&self, peers: &[PeerId], request: InventoryRequest) {
        self.0.get_inventory(peers, request);
    }
}
