//! Push scheduler.
//!
//! Responsibilities:
//! - Run one tick per cooldown: select stale feeds, push them as one batch.
//! - Stop promptly on the shutdown signal, checked before each tick and
//!   throughout the cooldown wait.
//! - Stop with an error when the pipeline reports a fatal condition.
//!
//! Ticks are strictly sequential; a tick's submission completes before the
//! next selection starts.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::logger::{TraceId, root_span};
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::{Instrument, Span, info};

use crate::error::PusherError;
use crate::execution::pipeline::{ChainSubmitter, PushPipeline, UpdateDataSource};
use crate::execution::types::PushOutcome;
use crate::metrics::counters::Counters;
use crate::planner::batch::select_batch;
use crate::price::listener::PriceListener;
use crate::price::types::FeedConfig;

pub struct PushScheduler<U: UpdateDataSource, C: ChainSubmitter> {
    feeds: Vec<FeedConfig>,

    /// Latest off-chain reference prices.
    source: Arc<dyn PriceListener>,

    /// Latest prices stored by the contract.
    target: Arc<dyn PriceListener>,

    pipeline: PushPipeline<U, C>,

    /// Wait between the end of one tick and the start of the next.
    cooldown: Duration,

    /// Observability counters (does not affect behavior).
    counters: Counters,
}

impl<U: UpdateDataSource, C: ChainSubmitter> PushScheduler<U, C> {
    pub fn new(
        feeds: Vec<FeedConfig>,
        source: Arc<dyn PriceListener>,
        target: Arc<dyn PriceListener>,
        pipeline: PushPipeline<U, C>,
        cooldown: Duration,
        counters: Counters,
    ) -> Self {
        Self {
            feeds,
            source,
            target,
            pipeline,
            cooldown,
            counters,
        }
    }

    /// One selection + push round.
    pub async fn tick(&self) -> Result<PushOutcome, PusherError> {
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        let batch = select_batch(&self.feeds, self.source.as_ref(), self.target.as_ref());

        Span::current().record("feed_count", batch.len());
        self.counters
            .feeds_selected
            .fetch_add(batch.len() as u64, Ordering::Relaxed);

        self.pipeline.push(&batch).await
    }

    /// Ticks until `shutdown` becomes `true` (or its sender is dropped).
    ///
    /// Returns `Err` only for fatal pipeline errors.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), PusherError> {
        info!(
            feeds = self.feeds.len(),
            cooldown_ms = self.cooldown.as_millis() as u64,
            "push scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let trace_id = TraceId::new();
            let span = root_span("push_tick", &trace_id);

            let outcome = self.tick().instrument(span.clone()).await?;
            span.record("outcome", outcome.label());

            if wait_cooldown(self.cooldown, &mut shutdown).await {
                break;
            }
        }

        info!(
            ticks = self.counters.ticks.load(Ordering::Relaxed),
            "push scheduler stopped"
        );
        Ok(())
    }
}

/// Sleeps for `cooldown`. Returns `true` if shutdown was requested meanwhile.
async fn wait_cooldown(cooldown: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = Instant::now() + cooldown;

    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn cooldown_elapses_without_signal() {
        let (_tx, mut rx) = watch::channel(false);
        let start = Instant::now();

        assert!(!wait_cooldown(Duration::from_secs(10), &mut rx).await);
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cuts_cooldown_short() {
        let (tx, mut rx) = watch::channel(false);
        let start = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send(true).unwrap();
        });

        assert!(wait_cooldown(Duration::from_secs(3_600), &mut rx).await);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn spurious_false_does_not_shorten_cooldown() {
        let (tx, mut rx) = watch::channel(false);
        let start = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send(false).unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        assert!(!wait_cooldown(Duration::from_secs(10), &mut rx).await);
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn dropped_sender_counts_as_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);

        assert!(wait_cooldown(Duration::from_secs(3_600), &mut rx).await);
    }
}
