use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::execution::pipeline::UpdateDataSource;
use crate::execution::types::UpdatePayload;
use crate::hermes::errors::HermesError;
use crate::hermes::types::{LatestUpdateEnvelope, ParsedPriceUpdate};
use crate::price::poller::PriceFetcher;
use crate::price::types::{FeedId, PriceObservation};

/// Client for the Hermes price service.
///
/// One endpoint serves both needs: parsed prices refresh the source listener,
/// the binary part is the update payload submitted on-chain.
#[derive(Clone)]
pub struct HermesClient {
    http: Client,
    url: String,
}

impl HermesClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, HermesError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    #[instrument(skip(self, ids), fields(feeds = ids.len()), level = "debug")]
    pub async fn fetch_latest_updates(
        &self,
        ids: &[FeedId],
    ) -> Result<LatestUpdateEnvelope, HermesError> {
        let url = format!("{}/v2/updates/price/latest", self.url);

        let mut query: Vec<(&str, String)> = ids.iter().map(|id| ("ids[]", id.to_hex())).collect();
        query.push(("encoding", "hex".into()));
        query.push(("parsed", "true".into()));

        let resp = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        let envelope: LatestUpdateEnvelope = resp.json().await?;

        debug!(
            updates = envelope.binary.data.len(),
            parsed = envelope.parsed.len(),
            "price service updates fetched"
        );

        Ok(envelope)
    }
}

/// Decodes the hex-encoded binary part of a response.
pub fn decode_binary(envelope: &LatestUpdateEnvelope) -> Result<UpdatePayload, HermesError> {
    if envelope.binary.encoding != "hex" {
        return Err(HermesError::InvalidResponse(format!(
            "unexpected binary encoding {:?}",
            envelope.binary.encoding
        )));
    }

    let updates = envelope
        .binary
        .data
        .iter()
        .map(|d| hex::decode(d.strip_prefix("0x").unwrap_or(d)))
        .collect::<Result<Vec<_>, _>>()?;

    if updates.is_empty() {
        return Err(HermesError::InvalidResponse("empty update data".into()));
    }

    Ok(UpdatePayload::new(updates))
}

/// Converts one parsed entry into `(id, observation)` using the spot price.
pub fn to_observation(
    parsed: &ParsedPriceUpdate,
) -> Result<(FeedId, PriceObservation), HermesError> {
    let id: FeedId = parsed
        .id
        .parse()
        .map_err(|_| HermesError::InvalidResponse(format!("bad feed id {}", parsed.id)))?;

    Ok((
        id,
        PriceObservation {
            price: parsed.price.price.parse()?,
            conf: parsed.price.conf.parse()?,
            expo: parsed.price.expo,
            publish_time: parsed.price.publish_time,
        },
    ))
}

#[async_trait]
impl UpdateDataSource for HermesClient {
    async fn fetch_update_data(&self, ids: &[FeedId]) -> anyhow::Result<UpdatePayload> {
        let envelope = self.fetch_latest_updates(ids).await?;
        Ok(decode_binary(&envelope)?)
    }
}

#[async_trait]
impl PriceFetcher for HermesClient {
    async fn fetch_latest(
        &self,
        ids: &[FeedId],
    ) -> anyhow::Result<Vec<(FeedId, PriceObservation)>> {
        let envelope = self.fetch_latest_updates(ids).await?;

        let mut out = Vec::with_capacity(envelope.parsed.len());
        for parsed in &envelope.parsed {
            match to_observation(parsed) {
                Ok(entry) => out.push(entry),
                Err(e) => warn!(id = %parsed.id, error = %e, "skipping malformed price entry"),
            }
        }

        Ok(out)
    }
}
