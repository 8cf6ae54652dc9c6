//! Price poller
//!
//! Periodically asks a `PriceFetcher` for the latest observations of every
//! tracked feed and publishes them into a `PriceSnapshotStore`.
//!
//! Data flow:
//! Fetcher → Poller → PriceSnapshotStore → Scheduler

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::price::listener::PriceSnapshotStore;
use crate::price::types::{FeedId, PriceObservation};

/// Source of raw observations for one side (price service or on-chain contract).
///
/// Feeds the fetcher has no value for are simply left out of the result.
#[async_trait]
pub trait PriceFetcher: Send + Sync + 'static {
    async fn fetch_latest(&self, ids: &[FeedId]) -> anyhow::Result<Vec<(FeedId, PriceObservation)>>;
}

/// Runs until `shutdown` flips to `true` or its sender is dropped.
///
/// Fetch failures are logged and retried on the next round; a listener that
/// stops on the first error would freeze its prices silently.
pub async fn run_price_poller<F: PriceFetcher>(
    side: &'static str,
    fetcher: Arc<F>,
    ids: Vec<FeedId>,
    poll_every: Duration,
    store: PriceSnapshotStore,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(poll_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        side,
        feeds = ids.len(),
        every_ms = poll_every.as_millis() as u64,
        "price poller started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        poll_once(side, fetcher.as_ref(), &ids, &store).await;
    }

    info!(side, "price poller stopped");
}

/// One polling round. Returns how many stored observations changed.
pub async fn poll_once<F: PriceFetcher + ?Sized>(
    side: &'static str,
    fetcher: &F,
    ids: &[FeedId],
    store: &PriceSnapshotStore,
) -> usize {
    match fetcher.fetch_latest(ids).await {
        Ok(observations) => {
            let received = observations.len();
            let changed = observations
                .into_iter()
                .filter(|(id, obs)| store.update(*id, *obs))
                .count();
            debug!(side, received, changed, "price snapshot refreshed");
            changed
        }
        Err(e) => {
            warn!(side, error = ?e, "price fetch failed; keeping previous snapshot");
            0
        }
    }
}
