use crate::price::types::{FeedConfig, FeedId};

/// One feed selected for a push, with the on-chain baseline captured at decision time.
#[derive(Clone, Debug, PartialEq)]
pub struct PushItem {
    pub config: FeedConfig,

    /// Target publish time seen when the decision was made, plus one.
    /// The contract skips any feed whose update is not newer than this.
    pub baseline_publish_time: i64,
}

/// Feeds selected in one scheduler tick, in configuration order.
///
/// Invariant: a feed id appears at most once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PushBatch {
    items: Vec<PushItem>,
}

impl PushBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `item` unless its feed is already in the batch.
    /// Returns whether the item was added.
    pub fn push(&mut self, item: PushItem) -> bool {
        if self.contains(&item.config.id) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, id: &FeedId) -> bool {
        self.items.iter().any(|i| i.config.id == *id)
    }

    pub fn items(&self) -> &[PushItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn feed_ids(&self) -> Vec<FeedId> {
        self.items.iter().map(|i| i.config.id).collect()
    }

    /// Parallel to `feed_ids()`.
    pub fn baseline_publish_times(&self) -> Vec<i64> {
        self.items.iter().map(|i| i.baseline_publish_time).collect()
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.config.alias.as_str()).collect()
    }
}
