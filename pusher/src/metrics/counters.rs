use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::execution::types::PushOutcome;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub ticks: Arc<AtomicU64>,
    pub feeds_selected: Arc<AtomicU64>,

    // outcomes
    pub push_noop: Arc<AtomicU64>,
    pub push_fetch_failed: Arc<AtomicU64>,
    pub push_accepted: Arc<AtomicU64>,
    pub push_already_fresh: Arc<AtomicU64>,
    pub push_nonce_conflict: Arc<AtomicU64>,
    pub push_unknown_error: Arc<AtomicU64>,
    pub push_fatal: Arc<AtomicU64>,
}

impl Counters {
    pub fn record_outcome(&self, outcome: &PushOutcome) {
        let c = match outcome {
            PushOutcome::NoOp => &self.push_noop,
            PushOutcome::FetchFailed { .. } => &self.push_fetch_failed,
            PushOutcome::Accepted { .. } => &self.push_accepted,
            PushOutcome::AlreadyFresh => &self.push_already_fresh,
            PushOutcome::NonceConflict => &self.push_nonce_conflict,
            PushOutcome::Unknown { .. } => &self.push_unknown_error,
        };
        c.fetch_add(1, Ordering::Relaxed);
    }
}

/// Relaxed read, for logs and tests.
pub fn read(c: &AtomicU64) -> u64 {
    c.load(Ordering::Relaxed)
}
