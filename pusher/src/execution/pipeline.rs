//! Submission pipeline.
//!
//! Turns a `PushBatch` into at most one on-chain transaction and classifies
//! what happened.
//!
//! Failure policy:
//! - **Fail-open**: fetch failures, timeouts and unrecognized chain errors are
//!   reported and resolved to an outcome; the next tick re-evaluates from scratch.
//! - **Benign races** (already fresh, nonce conflict) are skipped quietly.
//! - **Fatal**: insufficient funds is the only error that leaves `push`.
//!
//! This module NEVER:
//! - decides which feeds are stale
//! - retries within a tick
//! - reads listener state (baselines come from the batch)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::logger::warn_if_slow;
use tracing::{debug, error, info, instrument, warn};

use crate::chain::errors::ChainError;
use crate::error::PusherError;
use crate::execution::types::{PipelineTimeouts, PushOutcome, UpdatePayload};
use crate::metrics::counters::Counters;
use crate::planner::types::PushBatch;
use crate::price::types::FeedId;

/// Upstream price service able to produce verifiable update data.
#[async_trait]
pub trait UpdateDataSource: Send + Sync + 'static {
    /// Update data for exactly `ids`, in any order the contract accepts.
    async fn fetch_update_data(&self, ids: &[FeedId]) -> anyhow::Result<UpdatePayload>;
}

/// Abstraction over the on-chain contract.
///
/// This trait intentionally hides:
/// - signing and nonce management
/// - RPC details
/// - client error formats
///
/// Implementations translate every failure into a `ChainError` variant.
#[async_trait]
pub trait ChainSubmitter: Send + Sync + 'static {
    /// Fee (in the chain's smallest unit) the contract charges for `payload`.
    async fn estimate_fee(&self, payload: &UpdatePayload) -> Result<u128, ChainError>;

    /// Sends the update. `feed_ids` and `baseline_publish_times` are parallel;
    /// the contract must skip any feed whose update is not newer than its baseline.
    ///
    /// Returns the transaction hash once the node accepted the transaction.
    async fn submit(
        &self,
        payload: &UpdatePayload,
        feed_ids: &[FeedId],
        baseline_publish_times: &[i64],
        fee: u128,
    ) -> Result<String, ChainError>;
}

pub struct PushPipeline<U: UpdateDataSource, C: ChainSubmitter> {
    updates: Arc<U>,
    chain: Arc<C>,
    timeouts: PipelineTimeouts,
    counters: Counters,
}

impl<U: UpdateDataSource, C: ChainSubmitter> PushPipeline<U, C> {
    pub fn new(
        updates: Arc<U>,
        chain: Arc<C>,
        timeouts: PipelineTimeouts,
        counters: Counters,
    ) -> Self {
        Self {
            updates,
            chain,
            timeouts,
            counters,
        }
    }

    /// Pushes `batch` as a single transaction.
    ///
    /// Returns `Err` only for conditions the process must stop on.
    #[instrument(skip_all, target = "execution", fields(feeds = batch.len()))]
    pub async fn push(&self, batch: &PushBatch) -> Result<PushOutcome, PusherError> {
        let result = self.push_inner(batch).await;

        match &result {
            Ok(outcome) => {
                self.counters.record_outcome(outcome);
                report(batch, outcome);
            }
            Err(e) => {
                self.counters
                    .push_fatal
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                error!(error = %e, aliases = ?batch.aliases(), "fatal push failure; stopping");
            }
        }

        result
    }

    async fn push_inner(&self, batch: &PushBatch) -> Result<PushOutcome, PusherError> {
        if batch.is_empty() {
            return Ok(PushOutcome::NoOp);
        }

        let feed_ids = batch.feed_ids();
        let baselines = batch.baseline_publish_times();

        let fetch = self.updates.fetch_update_data(&feed_ids);
        let payload = match bounded(self.timeouts.fetch, fetch).await {
            Ok(Ok(p)) => p,
            Ok(Err(e)) => {
                return Ok(PushOutcome::FetchFailed {
                    reason: format!("{e:#}"),
                });
            }
            Err(elapsed) => {
                return Ok(PushOutcome::FetchFailed {
                    reason: format!("update data fetch timed out after {elapsed:?}"),
                });
            }
        };

        debug!(updates = payload.updates.len(), bytes = payload.size(), "update payload fetched");

        let fee = match bounded(self.timeouts.chain, self.chain.estimate_fee(&payload)).await {
            Ok(Ok(fee)) => fee,
            Ok(Err(e)) => {
                return Ok(PushOutcome::Unknown {
                    detail: format!("fee estimation failed: {e}"),
                });
            }
            Err(elapsed) => {
                return Ok(PushOutcome::Unknown {
                    detail: format!("fee estimation timed out after {elapsed:?}"),
                });
            }
        };

        debug!(fee, "update fee estimated");

        let submitted = warn_if_slow(
            "submit_price_update",
            Duration::from_secs(5),
            bounded(
                self.timeouts.chain,
                self.chain.submit(&payload, &feed_ids, &baselines, fee),
            ),
        )
        .await;

        match submitted {
            Ok(result) => classify(result),
            Err(elapsed) => Ok(PushOutcome::Unknown {
                detail: format!("submission timed out after {elapsed:?}"),
            }),
        }
    }
}

/// Maps the chain adapter's result into an outcome, or the fatal error.
pub fn classify(result: Result<String, ChainError>) -> Result<PushOutcome, PusherError> {
    match result {
        Ok(tx_hash) => Ok(PushOutcome::Accepted { tx_hash }),
        Err(ChainError::NoFreshUpdate) => Ok(PushOutcome::AlreadyFresh),
        Err(ChainError::NonceConflict(_)) => Ok(PushOutcome::NonceConflict),
        Err(ChainError::InsufficientFunds(detail)) => Err(PusherError::InsufficientFunds(detail)),
        Err(ChainError::Other(detail)) => Ok(PushOutcome::Unknown { detail }),
    }
}

async fn bounded<F, T>(limit: Duration, fut: F) -> Result<T, Duration>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut).await.map_err(|_| limit)
}

fn report(batch: &PushBatch, outcome: &PushOutcome) {
    let aliases = batch.aliases();
    match outcome {
        PushOutcome::NoOp => {}
        PushOutcome::Accepted { tx_hash } => {
            info!(%tx_hash, ?aliases, "price update submitted")
        }
        PushOutcome::AlreadyFresh => {
            debug!(?aliases, "on-chain prices already fresh; skipped")
        }
        PushOutcome::NonceConflict => {
            debug!(?aliases, "nonce taken by a concurrent sender; skipped")
        }
        PushOutcome::FetchFailed { reason } => {
            warn!(%reason, ?aliases, "update data unavailable; tick aborted")
        }
        PushOutcome::Unknown { detail } => {
            error!(%detail, ?aliases, "price update failed with unrecognized error")
        }
    }
}
