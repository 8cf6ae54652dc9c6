//! EVM adapter for the Pyth price feed contract.
//!
//! The only place that sees `ethers` errors; every failure leaves this module
//! as a `ChainError`.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use ethers::contract::{ContractError, abigen};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::coins_bip39::English;
use ethers::signers::{LocalWallet, MnemonicBuilder, Signer};
use ethers::types::{Address, Bytes, U256};
use tracing::{debug, info, instrument, warn};

use crate::chain::errors::ChainError;
use crate::execution::pipeline::ChainSubmitter;
use crate::execution::types::UpdatePayload;
use crate::price::poller::PriceFetcher;
use crate::price::types::{FeedId, PriceObservation};

abigen!(
    PythContract,
    r#"[
        function getUpdateFee(bytes[] updateData) external view returns (uint256 feeAmount)
        function updatePriceFeedsIfNecessary(bytes[] updateData, bytes32[] priceIds, uint64[] publishTimes) external payable
        function getPriceUnsafe(bytes32 id) external view returns (int64 price, uint64 conf, int32 expo, uint256 publishTime)
    ]"#
);

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub struct EvmPythClient {
    contract: PythContract<SignerClient>,
}

impl EvmPythClient {
    /// Connects to `rpc_endpoint` and signs with the first account derived from `mnemonic`.
    pub async fn connect(
        rpc_endpoint: &str,
        contract_address: &str,
        mnemonic: &str,
    ) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_endpoint)
            .with_context(|| format!("invalid RPC endpoint '{rpc_endpoint}'"))?;

        let chain_id = provider
            .get_chainid()
            .await
            .context("failed to query chain id")?;

        let wallet: LocalWallet = MnemonicBuilder::<English>::default()
            .phrase(mnemonic.trim())
            .build()
            .context("invalid mnemonic")?;
        let signer = wallet.with_chain_id(chain_id.as_u64());

        let address: Address = contract_address
            .parse()
            .with_context(|| format!("invalid contract address '{contract_address}'"))?;

        info!(
            chain_id = chain_id.as_u64(),
            sender = %format!("{:#x}", signer.address()),
            contract = %contract_address,
            "connected to target chain"
        );

        let client = Arc::new(SignerMiddleware::new(provider, signer));

        Ok(Self {
            contract: PythContract::new(address, client),
        })
    }
}

fn to_bytes(payload: &UpdatePayload) -> Vec<Bytes> {
    payload.updates.iter().cloned().map(Bytes::from).collect()
}

/// The single translation point from client errors to `ChainError`.
fn translate(err: ContractError<SignerClient>) -> ChainError {
    let revert = err.as_revert().map(|b| b.to_vec());
    ChainError::classify(revert.as_deref(), &err.to_string())
}

#[async_trait]
impl ChainSubmitter for EvmPythClient {
    async fn estimate_fee(&self, payload: &UpdatePayload) -> Result<u128, ChainError> {
        let fee: U256 = self
            .contract
            .get_update_fee(to_bytes(payload))
            .call()
            .await
            .map_err(translate)?;

        if fee > U256::from(u128::MAX) {
            return Err(ChainError::Other(format!("update fee {fee} out of range")));
        }
        Ok(fee.as_u128())
    }

    #[instrument(skip_all, fields(feeds = feed_ids.len(), fee = %fee), level = "debug")]
    async fn submit(
        &self,
        payload: &UpdatePayload,
        feed_ids: &[FeedId],
        baseline_publish_times: &[i64],
        fee: u128,
    ) -> Result<String, ChainError> {
        let price_ids: Vec<[u8; 32]> = feed_ids.iter().map(|id| *id.as_bytes()).collect();
        let publish_times: Vec<u64> = baseline_publish_times
            .iter()
            .map(|t| (*t).max(0) as u64)
            .collect();

        let call = self
            .contract
            .update_price_feeds_if_necessary(to_bytes(payload), price_ids, publish_times)
            .value(U256::from(fee));

        let pending = call.send().await.map_err(translate)?;
        let tx_hash = format!("{:#x}", pending.tx_hash());

        debug!(%tx_hash, "update transaction accepted by node");
        Ok(tx_hash)
    }
}

#[async_trait]
impl PriceFetcher for EvmPythClient {
    /// Feeds the contract has never stored revert and are left out.
    async fn fetch_latest(
        &self,
        ids: &[FeedId],
    ) -> anyhow::Result<Vec<(FeedId, PriceObservation)>> {
        let mut reads = Vec::with_capacity(ids.len());

        for id in ids {
            let read = match self.contract.get_price_unsafe(*id.as_bytes()).call().await {
                Ok((price, conf, expo, publish_time)) => Ok(Some(PriceObservation {
                    price,
                    conf,
                    expo,
                    publish_time: publish_time.low_u64() as i64,
                })),
                Err(e) if e.is_revert() => Ok(None),
                Err(e) => Err(e.to_string()),
            };
            reads.push((*id, read));
        }

        collect_reads(reads)
    }
}

/// Per-feed outcome of an on-chain price read: `Ok(None)` when the feed is not stored yet.
type PriceRead = Result<Option<PriceObservation>, String>;

/// Keeps every feed that was read; failed reads are logged and skipped.
///
/// Errors only when every read failed, so the poller reports the round.
fn collect_reads(
    reads: Vec<(FeedId, PriceRead)>,
) -> anyhow::Result<Vec<(FeedId, PriceObservation)>> {
    let total = reads.len();
    let mut out = Vec::with_capacity(total);
    let mut failed = 0;
    let mut last_error = None;

    for (id, read) in reads {
        match read {
            Ok(Some(obs)) => out.push((id, obs)),
            Ok(None) => debug!(%id, "feed not yet stored on-chain"),
            Err(e) => {
                warn!(%id, error = %e, "getPriceUnsafe failed; skipping feed");
                failed += 1;
                last_error = Some(e);
            }
        }
    }

    if failed > 0 && failed == total {
        let e = last_error.unwrap_or_default();
        anyhow::bail!("getPriceUnsafe failed for all {total} feeds: {e}");
    }

    Ok(out)
}
