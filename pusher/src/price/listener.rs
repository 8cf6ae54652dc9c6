use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::price::types::{FeedId, PriceObservation};

/// Read side of a price listener.
///
/// Implementations must not block: the scheduler calls this once per feed on
/// every tick and expects the most recently received value.
pub trait PriceListener: Send + Sync {
    fn latest(&self, id: &FeedId) -> Option<PriceObservation>;
}

/// In-memory store of the latest observation per feed.
///
/// Written by a poller task, read by the scheduler. Observations are replaced
/// wholesale; a feed that was never observed has no entry.
#[derive(Clone, Default)]
pub struct PriceSnapshotStore {
    inner: Arc<RwLock<HashMap<FeedId, PriceObservation>>>,
}

impl PriceSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `obs` unless the store already holds a newer observation.
    ///
    /// Returns `true` when the stored value changed.
    pub fn update(&self, id: FeedId, obs: PriceObservation) -> bool {
        let mut g = self.inner.write();
        match g.get(&id) {
            Some(current) if current.publish_time > obs.publish_time => false,
            Some(current) if *current == obs => false,
            _ => {
                g.insert(id, obs);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl PriceListener for PriceSnapshotStore {
    fn latest(&self, id: &FeedId) -> Option<PriceObservation> {
        self.inner.read().get(id).copied()
    }
}
