use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub holds_created: Arc<AtomicU64>,
    pub hold_commit_retries: Arc<AtomicU64>,

    // hold failures
    pub holds_no_tables: Arc<AtomicU64>,
    pub holds_conflict_exhausted: Arc<AtomicU64>,
    pub holds_gateway_failed: Arc<AtomicU64>,

    pub holds_cancelled: Arc<AtomicU64>,

    // confirmation
    pub confirmations: Arc<AtomicU64>,
    pub confirmations_duplicate: Arc<AtomicU64>,
    pub confirmations_unknown: Arc<AtomicU64>,
    pub confirmations_rejected: Arc<AtomicU64>,
    pub number_collisions: Arc<AtomicU64>,

    pub holds_expired: Arc<AtomicU64>,
}
