//! Sync layer metrics

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Gauge,
};

/// Hashes known to the network but not yet resolved locally
pub static SYNC_PENDING_HASHES: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "sync_pending_hashes",
        "Hashes known to the network but not yet resolved locally"
    )
    .expect("Failed to register sync_pending_hashes metric")
});

/// Blocks buffered while their parent is missing
pub static SYNC_ORPHAN_BLOCKS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "sync_orphan_blocks",
        "Blocks buffered while their parent is missing"
    )
    .expect("Failed to register sync_orphan_blocks metric")
});

/// Blocks delivered to the consensus engine
pub static SYNC_BLOCKS_DELIVERED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "sync_blocks_delivered_total",
        "Blocks delivered to the consensus engine in causal order"
    )
    .expect("Failed to register sync_blocks_delivered metric")
});

/// Votes passed down and re-gossiped
pub static SYNC_VOTES_RELAYED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "sync_votes_relayed_total",
        "Votes passed down to the consumer and re-gossiped"
    )
    .expect("Failed to register sync_votes_relayed metric")
});

/// Duplicate votes suppressed
pub static SYNC_DUPLICATE_VOTES: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "sync_duplicate_votes_total",
        "Votes dropped by the exact-match dedup rule"
    )
    .expect("Failed to register sync_duplicate_votes metric")
});

/// Data requests issued, by target kind
pub static SYNC_REQUESTS_SENT: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sync_requests_sent_total",
        "Data requests issued by the fetch scheduler",
        &["target"]
    )
    .expect("Failed to register sync_requests_sent metric")
});

/// Hashes dropped after exhausting their fetch attempts
pub static SYNC_FETCH_GIVEUPS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "sync_fetch_giveups_total",
        "Hashes dropped after exhausting their fetch attempts"
    )
    .expect("Failed to register sync_fetch_giveups metric")
});

/// Inbound messages that failed to decode
pub static SYNC_DECODE_FAILURES: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "sync_decode_failures_total",
        "Inbound messages dropped because their payload failed to decode"
    )
    .expect("Failed to register sync_decode_failures metric")
});

/// Orphans evicted by the buffer cap
pub static SYNC_ORPHANS_EVICTED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "sync_orphans_evicted_total",
        "Orphan blocks evicted because the buffer cap was reached"
    )
    .expect("Failed to register sync_orphans_evicted metric")
});

/// Update the pending-hash gauge
pub fn set_pending_hashes(count: usize) {
    SYNC_PENDING_HASHES.set(count as f64);
}

/// Update the orphan-buffer gauge
pub fn set_orphan_blocks(count: usize) {
    SYNC_ORPHAN_BLOCKS.set(count as f64);
}

/// Record a data request aimed at one peer or broadcast
pub fn record_request(broadcast: bool) {
    let target = if broadcast { "broadcast" } else { "peer" };
    SYNC_REQUESTS_SENT.with_label_values(&[target]).inc();
}
