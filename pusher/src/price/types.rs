use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PusherError;

/// 32-byte price feed identifier.
///
/// Parsed from hex with or without a leading `0x`; displayed as lowercase hex
/// without the prefix, which is the form the price service uses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeedId([u8; 32]);

impl FeedId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for FeedId {
    type Err = PusherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(raw, &mut bytes)
            .map_err(|e| PusherError::InvalidFeedId(format!("{s}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for FeedId {
    type Error = PusherError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FeedId> for String {
    fn from(id: FeedId) -> Self {
        id.to_hex()
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedId({})", self.to_hex())
    }
}

/// Update triggers for a single tracked feed, loaded once at startup.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FeedConfig {
    /// Human-readable name used in logs (e.g. "BTC/USD").
    pub alias: String,

    pub id: FeedId,

    /// Push once the source is at least this many seconds ahead of the target.
    #[serde(rename = "time_difference")]
    pub time_difference_threshold: u64,

    /// Push once the source price deviates from the target by at least this percentage.
    #[serde(rename = "price_deviation")]
    pub price_deviation_threshold_pct: f64,

    /// Push once the source confidence interval reaches this percentage of its price.
    #[serde(rename = "confidence_ratio")]
    pub confidence_ratio_threshold_pct: f64,

    /// Looser triggers; a feed meeting only these joins a batch that is already
    /// being sent but never causes a transaction on its own.
    #[serde(default)]
    pub early_update: Option<EarlyUpdateConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct EarlyUpdateConfig {
    #[serde(rename = "time_difference", default)]
    pub time_difference_threshold: Option<u64>,

    #[serde(rename = "price_deviation", default)]
    pub price_deviation_threshold_pct: Option<f64>,

    #[serde(rename = "confidence_ratio", default)]
    pub confidence_ratio_threshold_pct: Option<f64>,
}

/// Latest price observation for one feed from one side (source or target).
///
/// `price` and `conf` are the raw integer mantissas scaled by `10^expo`.
/// Every staleness signal is a ratio, so the exponent only matters for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceObservation {
    pub price: i64,
    pub conf: u64,
    pub expo: i32,
    /// Unix seconds.
    pub publish_time: i64,
}

impl PriceObservation {
    /// Price as a float in quote units.
    pub fn scaled_price(&self) -> f64 {
        self.price as f64 * 10f64.powi(self.expo)
    }
}

/// Three-valued result of evaluating one feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateCondition {
    /// Main thresholds tripped; this feed alone justifies a transaction.
    Yes,
    /// Only early-update thresholds tripped; ride along if something else is pushed.
    Early,
    No,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BTC: &str = "e62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43";

    #[test]
    fn feed_id_accepts_optional_prefix() {
        let bare: FeedId = BTC.parse().unwrap();
        let prefixed: FeedId = format!("0x{BTC}").parse().unwrap();

        assert_eq!(bare, prefixed);
        assert_eq!(bare.to_string(), BTC);
    }

    #[test]
    fn feed_id_rejects_wrong_length() {
        assert!("abcd".parse::<FeedId>().is_err());
        assert!(format!("{BTC}00").parse::<FeedId>().is_err());
    }

    #[test]
    fn feed_id_rejects_non_hex() {
        let bad = "zz".repeat(32);
        assert!(bad.parse::<FeedId>().is_err());
    }

    #[test]
    fn feed_config_parses_from_yaml() {
        let yaml = format!(
            r#"
alias: BTC/USD
id: "0x{BTC}"
time_difference: 60
price_deviation: 0.5
confidence_ratio: 1
early_update:
  time_difference: 30
"#
        );

        let cfg: FeedConfig = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(cfg.alias, "BTC/USD");
        assert_eq!(cfg.id.to_hex(), BTC);
        assert_eq!(cfg.time_difference_threshold, 60);
        assert_eq!(cfg.price_deviation_threshold_pct, 0.5);
        assert_eq!(cfg.confidence_ratio_threshold_pct, 1.0);

        let early = cfg.early_update.unwrap();
        assert_eq!(early.time_difference_threshold, Some(30));
        assert_eq!(early.price_deviation_threshold_pct, None);
    }

    #[test]
    fn scaled_price_applies_exponent() {
        let obs = PriceObservation {
            price: 6_512_345_000_000,
            conf: 1,
            expo: -8,
            publish_time: 0,
        };

        assert!((obs.scaled_price() - 65_123.45).abs() < 1e-6);
    }
}
