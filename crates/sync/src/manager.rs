//! Sync manager: the message pump between the p2p network and consensus.
//!
//! Registers for a fixed set of logical channels, serializes all inbound
//! traffic through one bounded queue, and dispatches each message to the
//! inventory, data or consensus-gossip handlers. Catch-up queries from
//! peers are answered from the local chain; decoded blocks flow into the
//! [`RequestManager`], votes and proposals go to the consumer after dedup.

use crate::codec;
use crate::config::SyncConfig;
use crate::consensus::{ConsensusEngine, ConsensusMessage, MessageConsumer};
use crate::dispatcher::{Dispatcher, SenderAdapter};
use crate::error::{Result, SyncError};
use crate::message::{
    hashes_to_hex, DataRequest, DataResponse, InventoryRequest, InventoryResponse, Message,
    SyncMessage,
};
use crate::metrics;
use crate::requests::RequestManager;
use async_trait::async_trait;
use meridian_store::BlockStore;
use meridian_types::{Block, ChannelId, Hash, PeerId, Proposal, Vote};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

/// Network-facing registration surface of the sync layer.
///
/// The p2p layer registers one handler per channel set; framed bytes are
/// parsed with [`parse_message`](Self::parse_message) and enqueued with
/// [`handle_message`](Self::handle_message).
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// The channels this handler subscribes to.
    fn channel_ids(&self) -> Vec<ChannelId>;

    /// Decode framed bytes into a [`Message`] with transport context.
    fn parse_message(&self, peer_id: &str, channel_id: ChannelId, bytes: &[u8])
        -> Result<Message>;

    /// Encode an envelope for the wire.
    fn encode_message(&self, message: &SyncMessage) -> Result<Vec<u8>>;

    /// Enqueue a parsed message for processing.
    async fn handle_message(&self, message: Message) -> Result<()>;
}

/// Intermediate layer between the consensus engine and the p2p network.
///
/// Manages fast block sync among peers and buffers orphaned blocks;
/// consensus gossip (votes, proposals) is passed through to the consumer.
pub struct SyncManager {
    chain: Arc<dyn BlockStore>,
    consensus: Arc<dyn ConsensusEngine>,
    consumer: Arc<dyn MessageConsumer>,
    dispatcher: Arc<dyn Dispatcher>,
    request_mgr: Arc<RequestManager>,
    config: SyncConfig,

    incoming_tx: mpsc::Sender<Message>,
    /// Taken by the main loop on start.
    incoming_rx: Mutex<Option<mpsc::Receiver<Message>>>,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl SyncManager {
    /// Wire up a sync manager and its request manager.
    ///
    /// Nothing runs until [`start`](Self::start) is called.
    pub fn new(
        chain: Arc<dyn BlockStore>,
        consensus: Arc<dyn ConsensusEngine>,
        dispatcher: Arc<dyn Dispatcher>,
        consumer: Arc<dyn MessageConsumer>,
        config: SyncConfig,
    ) -> Self {
        let (incoming_tx, incoming_rx) = mpsc::channel(config.message_queue_size.max(1));
        let sender = Arc::new(SenderAdapter(dispatcher.clone()));
        let request_mgr = Arc::new(RequestManager::new(
            chain.clone(),
            consensus.clone(),
            consumer.clone(),
            sender,
            config.clone(),
        ));

        Self {
            chain,
            consensus,
            consumer,
            dispatcher,
            request_mgr,
            config,
            incoming_tx,
            incoming_rx: Mutex::new(Some(incoming_rx)),
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Spawn the main loop and the request manager. Returns immediately.
    ///
    /// Cancelling `token` (or calling [`stop`](Self::stop)) shuts both
    /// down; the main loop finishes the message in hand first.
    pub fn start(self: &Arc<Self>, token: CancellationToken) {
        let own = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => own.cancel(),
                _ = own.cancelled() => {}
            }
        });

        self.request_mgr.start(self.token.clone());

        match self.incoming_rx.lock().take() {
            Some(rx) => {
                let manager = Arc::clone(self);
                let loop_token = self.token.clone();
                self.tracker
                    .spawn(async move { manager.main_loop(rx, loop_token).await });
            }
            None => warn!("sync manager already started"),
        }
        self.tracker.close();
    }

    /// Request shutdown; idempotent.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Resolve once the main loop and the request manager have exited.
    pub async fn wait(&self) {
        self.tracker.wait().await;
        self.request_mgr.wait().await;
    }

    /// The request manager, for embedding code that wants to feed hashes
    /// or blocks directly or observe its depth.
    pub fn request_manager(&self) -> &Arc<RequestManager> {
        &self.request_mgr
    }

    /// Enqueue a message, waiting while the inbound queue is full.
    ///
    /// This is the loss-free default: the producer blocks on a full queue.
    /// Callers that must not wait use
    /// [`try_handle_message`](Self::try_handle_message) instead. Fails with
    /// [`SyncError::Shutdown`] once the main loop has exited.
    pub async fn handle_message(&self, message: Message) -> Result<()> {
        self.incoming_tx
            .send(message)
            .await
            .map_err(|_| SyncError::Shutdown)
    }

    /// Enqueue a message without waiting; fails with
    /// [`SyncError::Backpressure`] when the queue is full.
    pub fn try_handle_message(&self, message: Message) -> Result<()> {
        self.incoming_tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SyncError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => SyncError::Shutdown,
        })
    }

    async fn main_loop(&self, mut rx: mpsc::Receiver<Message>, token: CancellationToken) {
        debug!(id = %self.consensus.id(), "sync manager started");
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("sync manager stopping");
                    return;
                }
                maybe = rx.recv() => match maybe {
                    Some(message) => self.process_message(message),
                    None => return,
                }
            }
        }
    }

    fn process_message(&self, message: Message) {
        let peer_id = message.peer_id;
        match message.content {
            SyncMessage::InventoryRequest(request) => self.handle_inv_request(&peer_id, request),
            SyncMessage::InventoryResponse(response) => {
                self.handle_inv_response(&peer_id, response)
            }
            SyncMessage::DataRequest(request) => self.handle_data_request(&peer_id, request),
            SyncMessage::DataResponse(response) => self.handle_data_response(&peer_id, response),
        }
    }

    /// Find the first start hash that exists in the local chain.
    fn locate_start(&self, starts: &[String]) -> Option<Hash> {
        for raw in starts {
            match Hash::from_hex(raw) {
                Ok(hash) => {
                    if !hash.is_empty() && self.chain.find_block(&hash).is_some() {
                        return Some(hash);
                    }
                }
                Err(error) => {
                    warn!(entry = raw.as_str(), %error, "malformed start hash in inventory request");
                }
            }
        }
        None
    }

    /// Walk local blocks from `start` until `end` or the inventory cap.
    ///
    /// Per node the walk follows the first finalized child when one exists;
    /// only beyond the finalized frontier (height at or above the last
    /// finalized block) does it fan out over all children, exposing the
    /// fork region so the peer can pick a branch. The current last
    /// finalized block hash is always appended so the receiver learns the
    /// latest network state even when its walk ended on a stale branch.
    fn collect_blocks(&self, start: Hash, end: Hash) -> Vec<Hash> {
        let lfb = self.consensus.last_finalized_block();
        let lfb_height = lfb.height();
        let max = self.config.max_inventory_size;

        let mut entries: Vec<Hash> = Vec::new();
        let mut queue: VecDeque<Hash> = VecDeque::new();
        queue.push_back(start);

        while entries.len() + 1 < max {
            let Some(current) = queue.pop_front() else {
                break;
            };
            let Some(block) = self.chain.find_block(&current) else {
                debug!(hash = %current, "failed to find block during inventory walk");
                break;
            };
            entries.push(current);
            if current == end {
                break;
            }

            let finalized_child = block.children.iter().copied().find(|child| {
                self.chain
                    .find_block(child)
                    .is_some_and(|c| c.status.is_finalized())
            });
            match finalized_child {
                // The finalized history is a chain, not a tree: follow it.
                Some(child) => queue.push_back(child),
                None if block.height() >= lfb_height => {
                    queue.extend(block.children.iter().copied());
                }
                // Below the finalized height with no finalized child the
                // branch is dead; stop walking it.
                None => {}
            }
        }

        // Keep the response within the size limit.
        if entries.len() > max.saturating_sub(1) {
            entries.truncate(max.saturating_sub(1));
        }

        // Trailing last-finalized-block hash, always.
        entries.push(lfb.hash());
        entries
    }

    fn handle_inv_request(&self, peer_id: &PeerId, request: InventoryRequest) {
        debug!(
            peer = %peer_id,
            channel = %request.channel_id,
            starts = request.starts.len(),
            end = request.end.as_str(),
            "received inventory request"
        );

        match request.channel_id {
            ChannelId::Block => {
                let end = if request.end.is_empty() {
                    Hash::EMPTY
                } else {
                    match Hash::from_hex(&request.end) {
                        Ok(hash) => hash,
                        Err(error) => {
                            warn!(peer = %peer_id, %error, "malformed end hash in inventory request");
                            Hash::EMPTY
                        }
                    }
                };

                let entries = match self.locate_start(&request.starts) {
                    Some(start) => self.collect_blocks(start, end),
                    None => {
                        // No shared history: an empty walk still carries
                        // the latest finalization.
                        debug!(peer = %peer_id, "no start hash found in local chain");
                        vec![self.consensus.last_finalized_block().hash()]
                    }
                };

                let response = InventoryResponse {
                    channel_id: ChannelId::Block,
                    entries: hashes_to_hex(&entries),
                };
                debug!(peer = %peer_id, entries = response.entries.len(), "sending inventory response");
                self.dispatcher
                    .send_inventory(std::slice::from_ref(peer_id), response);
            }
            channel => {
                warn!(%channel, peer = %peer_id, "unsupported channel in inventory request");
            }
        }
    }

    fn handle_inv_response(&self, peer_id: &PeerId, response: InventoryResponse) {
        debug!(
            peer = %peer_id,
            channel = %response.channel_id,
            entries = response.entries.len(),
            "received inventory response"
        );

        match response.channel_id {
            ChannelId::Block => {
                for raw in &response.entries {
                    match Hash::from_hex(raw) {
                        Ok(hash) => {
                            self.request_mgr
                                .add_hash(hash, std::slice::from_ref(peer_id));
                        }
                        Err(error) => {
                            warn!(peer = %peer_id, %error, "malformed hash in inventory response");
                        }
                    }
                }
            }
            channel => {
                warn!(%channel, peer = %peer_id, "unsupported channel in inventory response");
            }
        }
    }

    fn handle_data_request(&self, peer_id: &PeerId, request: DataRequest) {
        match request.channel_id {
            ChannelId::Block => {
                for raw in &request.entries {
                    let hash = match Hash::from_hex(raw) {
                        Ok(hash) => hash,
                        Err(error) => {
                            warn!(peer = %peer_id, %error, "malformed hash in data request");
                            return;
                        }
                    };
                    let Some(block) = self.chain.find_block(&hash) else {
                        // No partial batches: stop at the first miss.
                        debug!(peer = %peer_id, hash = %hash, "requested block not found locally");
                        return;
                    };
                    let payload = match codec::encode_block(&block.block) {
                        Ok(payload) => payload,
                        Err(err) => {
                            error!(hash = %hash, error = %err, "failed to encode block");
                            return;
                        }
                    };
                    debug!(peer = %peer_id, hash = %hash, "sending requested block");
                    self.dispatcher.send_data(
                        std::slice::from_ref(peer_id),
                        DataResponse {
                            channel_id: ChannelId::Block,
                            payload,
                        },
                    );
                }
            }
            channel => {
                warn!(%channel, peer = %peer_id, "unsupported channel in data request");
            }
        }
    }

    fn handle_data_response(&self, peer_id: &PeerId, response: DataResponse) {
        match response.channel_id {
            ChannelId::Block => match codec::decode_block(&response.payload) {
                Ok(block) => self.handle_block(block),
                Err(error) => {
                    metrics::SYNC_DECODE_FAILURES.inc();
                    warn!(peer = %peer_id, %error, "failed to decode block payload");
                }
            },
            ChannelId::Vote => match codec::decode_vote(&response.payload) {
                Ok(vote) => self.handle_vote(vote),
                Err(error) => {
                    metrics::SYNC_DECODE_FAILURES.inc();
                    warn!(peer = %peer_id, %error, "failed to decode vote payload");
                }
            },
            ChannelId::Proposal => match codec::decode_proposal(&response.payload) {
                Ok(proposal) => self.handle_proposal(proposal),
                Err(error) => {
                    metrics::SYNC_DECODE_FAILURES.inc();
                    warn!(peer = %peer_id, %error, "failed to decode proposal payload");
                }
            },
            channel => {
                warn!(%channel, peer = %peer_id, "unsupported channel in data response");
            }
        }
    }

    fn handle_block(&self, block: Block) {
        debug!(hash = %block.hash, parent = %block.parent, height = block.height, "received block");

        if self
            .chain
            .find_block(&block.hash)
            .is_some_and(|b| !b.status.is_pending())
        {
            return;
        }

        let hash = block.hash;
        self.request_mgr.add_block(block);

        // Advertise the block so other peers can pull it.
        self.dispatcher.send_inventory(
            &[],
            InventoryResponse {
                channel_id: ChannelId::Block,
                entries: vec![hash.to_hex()],
            },
        );
    }

    fn handle_vote(&self, vote: Vote) {
        debug!(
            block = %vote.block_hash,
            voter = %vote.voter,
            epoch = vote.epoch,
            "received vote"
        );

        // Exact-match dedup: block hash, voter, epoch and height.
        let known = self.chain.find_votes_by_hash(&vote.block_hash);
        if known.contains(&vote) {
            metrics::SYNC_DUPLICATE_VOTES.inc();
            return;
        }
        self.chain.add_vote(vote.clone());

        self.consumer.add_message(ConsensusMessage::Vote(vote.clone()));

        // Intentional flooding; each hop's dedup terminates it.
        let payload = match codec::encode_vote(&vote) {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, "failed to encode vote");
                return;
            }
        };
        self.dispatcher.send_data(
            &[],
            DataResponse {
                channel_id: ChannelId::Vote,
                payload,
            },
        );
        metrics::SYNC_VOTES_RELAYED.inc();
    }

    fn handle_proposal(&self, proposal: Proposal) {
        debug!(block = %proposal.block.hash, "received proposal");

        if let Some(votes) = &proposal.votes {
            for vote in votes.votes() {
                self.handle_vote(vote.clone());
            }
        }
        self.handle_block(proposal.block);
    }
}

#[async_trait]
impl MessageHandler for SyncManager {
    fn channel_ids(&self) -> Vec<ChannelId> {
        vec![
            ChannelId::Header,
            ChannelId::Block,
            ChannelId::Proposal,
            ChannelId::CC,
            ChannelId::Vote,
        ]
    }

    fn parse_message(
        &self,
        peer_id: &str,
        channel_id: ChannelId,
        bytes: &[u8],
    ) -> Result<Message> {
        let content = codec::decode_message(bytes)?;
        Ok(Message {
            peer_id: peer_id.to_string(),
            channel_id,
            content,
        })
    }

    fn encode_message(&self, message: &SyncMessage) -> Result<Vec<u8>> {
        codec::encode_message(message)
    }

    async fn handle_message(&self, message: Message) -> Result<()> {
        SyncManager::handle_message(self, message).await
    }
}
