//! Shared mocks for in-crate tests.

use crate::consensus::{ConsensusEngine, ConsensusMessage, MessageConsumer};
use crate::dispatcher::{Dispatcher, RequestSender};
use crate::message::{DataRequest, DataResponse, InventoryRequest, InventoryResponse};
use meridian_store::{BlockStore, ExtendedBlock, MemoryStore};
use meridian_types::{Hash, PeerId, Vote};
use parking_lot::Mutex;
use std::sync::Arc;

/// Consumer that records everything handed to it.
pub(crate) struct RecordingConsumer {
    messages: Mutex<Vec<ConsensusMessage>>,
}

impl RecordingConsumer {
    pub(crate) fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn messages(&self) -> Vec<ConsensusMessage> {
        self.messages.lock().clone()
    }

    pub(crate) fn block_hashes(&self) -> Vec<Hash> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                ConsensusMessage::Block(b) => Some(b.hash),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn votes(&self) -> Vec<Vote> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                ConsensusMessage::Vote(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }
}

impl MessageConsumer for RecordingConsumer {
    fn add_message(&self, message: ConsensusMessage) {
        self.messages.lock().push(message);
    }
}

/// Dispatcher that records every outbound send.
pub(crate) struct RecordingDispatcher {
    inventory_requests: Mutex<Vec<(Vec<PeerId>, InventoryRequest)>>,
    inventory_responses: Mutex<Vec<(Vec<PeerId>, InventoryResponse)>>,
    data_requests: Mutex<Vec<(Vec<PeerId>, DataRequest)>>,
    data_responses: Mutex<Vec<(Vec<PeerId>, DataResponse)>>,
}

impl RecordingDispatcher {
    pub(crate) fn new() -> Self {
        Self {
            inventory_requests: Mutex::new(Vec::new()),
            inventory_responses: Mutex::new(Vec::new()),
            data_requests: Mutex::new(Vec::new()),
            data_responses: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn inventory_requests(&self) -> Vec<(Vec<PeerId>, InventoryRequest)> {
        self.inventory_requests.lock().clone()
    }

    pub(crate) fn inventory_responses(&self) -> Vec<(Vec<PeerId>, InventoryResponse)> {
        self.inventory_responses.lock().clone()
    }

    pub(crate) fn data_requests(&self) -> Vec<(Vec<PeerId>, DataRequest)> {
        self.data_requests.lock().clone()
    }

    pub(crate) fn data_responses(&self) -> Vec<(Vec<PeerId>, DataResponse)> {
        self.data_responses.lock().clone()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn get_inventory(&self, peers: &[PeerId], request: InventoryRequest) {
        self.inventory_requests
            .lock()
            .push((peers.to_vec(), request));
    }

    fn send_inventory(&self, peers: &[PeerId], response: InventoryResponse) {
        self.inventory_responses
            .lock()
            .push((peers.to_vec(), response));
    }

    fn get_data(&self, peers: &[PeerId], request: DataRequest) {
        self.data_requests.lock().push((peers.to_vec(), request));
    }

    fn send_data(&self, peers: &[PeerId], response: DataResponse) {
        self.data_responses.lock().push((peers.to_vec(), response));
    }
}

impl RequestSender for RecordingDispatcher {
    fn get_data(&self, peers: &[PeerId], request: DataRequest) {
        self.data_requests.lock().push((peers.to_vec(), request));
    }

    fn get_inventory(&self, peers: &[PeerId], request: InventoryRequest) {
        self.inventory_requests
            .lock()
            .push((peers.to_vec(), request));
    }
}

/// Engine stub whose last finalized block is set by the test.
pub(crate) struct StaticEngine {
    id: String,
    store: Arc<MemoryStore>,
    lfb: Mutex<Hash>,
}

impl StaticEngine {
    pub(crate) fn new(id: &str, store: Arc<MemoryStore>, lfb: Hash) -> Self {
        Self {
            id: id.to_string(),
            store,
            lfb: Mutex::new(lfb),
        }
    }

    pub(crate) fn set_lfb(&self, hash: Hash) {
        *self.lfb.lock() = hash;
    }
}

impl ConsensusEngine for StaticEngine {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn last_finalized_block(&self) -> ExtendedBlock {
        let hash = *self.lfb.lock();
        self.store
            .find_block(&hash)
            .expect("last finalized block must be in the store")
    }
}
