use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::logger::init_logger;
use pusher::{
    chain::EvmPythClient,
    config::{AppConfig, load_price_config},
    execution::{PipelineTimeouts, PushPipeline},
    hermes::HermesClient,
    metrics::counters::Counters,
    price::{FeedConfig, FeedId, PriceFetcher, PriceSnapshotStore, run_price_poller},
    scheduler::PushScheduler,
};
use tokio::sync::watch;

/// Spawns a poller keeping `store` in sync with `fetcher`.
fn start_poller<F: PriceFetcher>(
    side: &'static str,
    fetcher: Arc<F>,
    feeds: &[FeedConfig],
    every: Duration,
    store: PriceSnapshotStore,
    shutdown: watch::Receiver<bool>,
) {
    let ids: Vec<FeedId> = feeds.iter().map(|f| f.id).collect();
    tokio::spawn(run_price_poller(side, fetcher, ids, every, store, shutdown));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cfg = AppConfig::from_env()?;
    init_logger("price-pusher", cfg.log_json);

    tracing::info!("Starting price pusher...");

    let feeds = load_price_config(&cfg.price_config_file)?;
    tracing::info!(feeds = feeds.len(), "price config loaded");

    let mnemonic = std::fs::read_to_string(&cfg.mnemonic_file)
        .with_context(|| format!("cannot read mnemonic file {}", cfg.mnemonic_file.display()))?;

    let hermes = Arc::new(HermesClient::new(
        cfg.price_service_endpoint.clone(),
        cfg.fetch_timeout,
    )?);
    let chain = Arc::new(
        EvmPythClient::connect(&cfg.rpc_endpoint, &cfg.contract_address, &mnemonic).await?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let source_prices = PriceSnapshotStore::new();
    let target_prices = PriceSnapshotStore::new();

    start_poller(
        "source",
        hermes.clone(),
        &feeds,
        cfg.polling_frequency,
        source_prices.clone(),
        shutdown_rx.clone(),
    );
    start_poller(
        "target",
        chain.clone(),
        &feeds,
        cfg.polling_frequency,
        target_prices.clone(),
        shutdown_rx.clone(),
    );

    let counters = Counters::default();
    let pipeline = PushPipeline::new(
        hermes,
        chain,
        PipelineTimeouts {
            fetch: cfg.fetch_timeout,
            chain: cfg.submit_timeout,
        },
        counters.clone(),
    );

    let scheduler = PushScheduler::new(
        feeds,
        Arc::new(source_prices),
        Arc::new(target_prices),
        pipeline,
        cfg.pushing_frequency,
        counters,
    );

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // Keep the sender alive; dropping it would stop the scheduler.
            tracing::error!(error = ?e, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    // Only a fatal pipeline error gets here as `Err`; it exits non-zero.
    scheduler.run(shutdown_rx).await?;

    Ok(())
}
