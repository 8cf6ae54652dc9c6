
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use mock_chain::{MockChain, MockUpdates};
use pusher::{
    chain::ChainError,
    error::PusherError,
    execution::{PipelineTimeouts, PushOutcome, PushPipeline},
    metrics::counters::{Counters, read},
    price::{FeedConfig, FeedId, PriceObservation, PriceSnapshotStore},
    scheduler::PushScheduler,
};

const COOLDOWN: Duration = Duration::from_secs(10);

fn feed_a() -> FeedConfig {
    FeedConfig {
        alias: "A/USD".into(),
        id: FeedId::new([0xa1; 32]),
        time_difference_threshold: 60,
        price_deviation_threshold_pct: 1.0,
        confidence_ratio_threshold_pct: 10.0,
        early_update: None,
    }
}

fn obs(price: i64, conf: u64, t: i64) -> PriceObservation {
    PriceObservation {
        price,
        conf,
        expo: 0,
        publish_time: t,
    }
}

struct Harness {
    scheduler: PushScheduler<MockUpdates, MockChain>,
    updates: Arc<MockUpdates>,
    chain: Arc<MockChain>,
    source: PriceSnapshotStore,
    target: PriceSnapshotStore,
    counters: Counters,
}

fn harness_with(
    feeds: Vec<FeedConfig>,
    source: PriceSnapshotStore,
    target: PriceSnapshotStore,
    updates: MockUpdates,
    chain: MockChain,
) -> Harness {
    let updates = Arc::new(updates);
    let chain = Arc::new(chain);
    let counters = Counters::default();

    let pipeline = PushPipeline::new(
        updates.clone(),
        chain.clone(),
        PipelineTimeouts::default(),
        counters.clone(),
    );

    let scheduler = PushScheduler::new(
        feeds,
        Arc::new(source.clone()),
        Arc::new(target.clone()),
        pipeline,
        COOLDOWN,
        counters.clone(),
    );

    Harness {
        scheduler,
        updates,
        chain,
        source,
        target,
        counters,
    }
}

fn harness(chain: MockChain) -> Harness {
    harness_with(
        vec![feed_a()],
        PriceSnapshotStore::new(),
        PriceSnapshotStore::new(),
        MockUpdates::new(),
        chain,
    )
}

#[tokio::test]
async fn fresh_feed_is_not_pushed() {
    let h = harness(MockChain::new());
    h.source.update(feed_a().id, obs(100, 1, 1_000));
    h.target.update(feed_a().id, obs(100, 1, 950));

    let outcome = h.scheduler.tick().await.unwrap();

    assert_eq!(outcome, PushOutcome::NoOp);
    assert_eq!(h.updates.call_count(), 0, "empty batch must not fetch update data");
    assert_eq!(h.chain.submit_count(), 0);
}

#[tokio::test]
async fn stale_feed_is_pushed_with_baseline() {
    let h = harness(MockChain::new());
    h.source.update(feed_a().id, obs(100, 1, 1_000));
    h.target.update(feed_a().id, obs(100, 1, 930));

    let outcome = h.scheduler.tick().await.unwrap();

    assert!(matches!(outcome, PushOutcome::Accepted { .. }));

    let subs = h.chain.submissions.lock().clone();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].feed_ids, vec![feed_a().id]);
    assert_eq!(subs[0].baselines, vec![931]);
    assert_eq!(subs[0].fee, 32);
    assert_eq!(read(&h.counters.feeds_selected), 1);
}

#[tokio::test]
async fn never_published_feed_uses_baseline_one() {
    let h = harness(MockChain::new());
    h.source.update(feed_a().id, obs(100, 1, 1_000));

    h.scheduler.tick().await.unwrap();

    assert_eq!(h.chain.submissions.lock()[0].baselines, vec![1]);
}

#[tokio::test]
async fn baseline_is_captured_at_decision_time() {
    let source = PriceSnapshotStore::new();
    let target = PriceSnapshotStore::new();
    source.update(feed_a().id, obs(100, 1, 1_000));
    target.update(feed_a().id, obs(100, 1, 930));

    let updates = MockUpdates {
        // A competing pusher lands a newer on-chain price while we fetch.
        refresh_during_fetch: Some((target.clone(), feed_a().id, obs(100, 1, 999))),
        ..MockUpdates::new()
    };

    let h = harness_with(vec![feed_a()], source, target, updates, MockChain::new());

    h.scheduler.tick().await.unwrap();

    assert_eq!(h.chain.submissions.lock()[0].baselines, vec![931]);
}

#[tokio::test]
async fn fetch_failure_is_not_fatal() {
    let updates = MockUpdates {
        fail: true,
        ..MockUpdates::new()
    };
    let h = harness_with(
        vec![feed_a()],
        PriceSnapshotStore::new(),
        PriceSnapshotStore::new(),
        updates,
        MockChain::new(),
    );
    h.source.update(feed_a().id, obs(100, 1, 1_000));

    let outcome = h.scheduler.tick().await.unwrap();

    assert!(matches!(outcome, PushOutcome::FetchFailed { .. }));
    assert_eq!(h.chain.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn insufficient_funds_stops_the_loop() {
    let h = harness(MockChain::with_script(vec![
        Err(ChainError::NoFreshUpdate),
        Err(ChainError::InsufficientFunds("balance 0".into())),
    ]));
    h.source.update(feed_a().id, obs(100, 1, 1_000));

    let (_tx, rx) = watch::channel(false);

    let err = h.scheduler.run(rx).await.unwrap_err();

    assert!(matches!(err, PusherError::InsufficientFunds(_)));
    assert_eq!(h.chain.submit_count(), 2);
    assert_eq!(read(&h.counters.push_already_fresh), 1);
    assert_eq!(read(&h.counters.push_fatal), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_and_race_errors_keep_the_loop_running() {
    let h = harness(MockChain::with_script(vec![
        Err(ChainError::Other("execution reverted: 0x1234".into())),
        Err(ChainError::NonceConflict("nonce too low".into())),
        Err(ChainError::NoFreshUpdate),
    ]));
    h.source.update(feed_a().id, obs(100, 1, 1_000));

    let (tx, rx) = watch::channel(false);

    let run = async {
        h.scheduler.run(rx).await
    };
    let stop = async {
        // Ticks at 0s, 10s, 20s and 30s; stop during the fourth cooldown.
        tokio::time::sleep(COOLDOWN * 3 + Duration::from_secs(5)).await;
        tx.send(true).unwrap();
    };

    let (result, ()) = tokio::join!(run, stop);

    assert!(result.is_ok());
    assert_eq!(h.chain.submit_count(), 4);
    assert_eq!(read(&h.counters.push_unknown_error), 1);
    assert_eq!(read(&h.counters.push_nonce_conflict), 1);
    assert_eq!(read(&h.counters.push_already_fresh), 1);
    assert_eq!(read(&h.counters.push_accepted), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_first_tick_does_nothing() {
    let h = harness(MockChain::new());
    h.source.update(feed_a().id, obs(100, 1, 1_000));

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    h.scheduler.run(rx).await.unwrap();

    assert_eq!(read(&h.counters.ticks), 0);
    assert_eq!(h.chain.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_cooldown() {
    let h = harness(MockChain::new());

    let (tx, rx) = watch::channel(false);
    let start = Instant::now();

    let stop = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();
    };

    let (result, ()) = tokio::join!(h.scheduler.run(rx), stop);

    assert!(result.is_ok());
    assert_eq!(read(&h.counters.ticks), 1);
    assert!(start.elapsed() < COOLDOWN);
}
