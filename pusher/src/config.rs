use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PusherError;
use crate::price::types::{EarlyUpdateConfig, FeedConfig};

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base URL of the price service (Hermes) used for source prices and update payloads.
    pub price_service_endpoint: String,

    /// JSON-RPC endpoint of the target chain.
    pub rpc_endpoint: String,

    /// Address of the deployed price feed contract.
    pub contract_address: String,

    /// File holding the BIP-39 mnemonic of the paying account.
    pub mnemonic_file: PathBuf,

    /// YAML file with the tracked feeds and their thresholds.
    pub price_config_file: PathBuf,

    // =========================
    // Cadence
    // =========================
    /// Cooldown between scheduler ticks.
    ///
    /// Every tick may cost one transaction, so this bounds on-chain spend.
    pub pushing_frequency: Duration,

    /// How often the source and target listeners refresh their snapshots.
    ///
    /// Should be shorter than `pushing_frequency`, otherwise ticks decide on
    /// stale snapshots.
    pub polling_frequency: Duration,

    // =========================
    // Timeouts
    // =========================
    /// Upper bound on fetching an update payload from the price service.
    pub fetch_timeout: Duration,

    /// Upper bound on each chain call (fee estimate, submission).
    pub submit_timeout: Duration,

    /// Emit JSON logs (production) instead of the pretty formatter.
    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, PusherError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PusherError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PusherError::Config(format!("missing required variable {key}")))
        };

        let secs = |key: &str, default: u64| -> Result<Duration, PusherError> {
            match lookup(key) {
                None => Ok(Duration::from_secs(default)),
                Some(v) => {
                    let n: u64 = v.trim().parse().map_err(|_| {
                        PusherError::Config(format!(
                            "{key} must be a whole number of seconds, got {v:?}"
                        ))
                    })?;
                    if n == 0 {
                        return Err(PusherError::Config(format!("{key} must be positive")));
                    }
                    Ok(Duration::from_secs(n))
                }
            }
        };

        Ok(Self {
            price_service_endpoint: required("PRICE_SERVICE_ENDPOINT")?
                .trim_end_matches('/')
                .to_string(),
            rpc_endpoint: required("RPC_ENDPOINT")?,
            contract_address: required("PYTH_CONTRACT_ADDRESS")?,
            mnemonic_file: required("MNEMONIC_FILE")?.into(),
            price_config_file: required("PRICE_CONFIG_FILE")?.into(),

            pushing_frequency: secs("PUSHING_FREQUENCY_SECS", 10)?,
            polling_frequency: secs("POLLING_FREQUENCY_SECS", 5)?,

            fetch_timeout: secs("FETCH_TIMEOUT_SECS", 10)?,
            submit_timeout: secs("SUBMIT_TIMEOUT_SECS", 60)?,

            log_json: lookup("APP_ENV").as_deref() == Some("production"),
        })
    }
}

/// Reads and validates the feed list.
pub fn load_price_config(path: &Path) -> Result<Vec<FeedConfig>, PusherError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| PusherError::Config(format!("cannot read {}: {e}", path.display())))?;
    parse_price_config(&raw)
}

/// Parses a YAML list of feeds and rejects anything the scheduler cannot
/// reason about: negative or non-finite thresholds, and duplicate ids.
pub fn parse_price_config(raw: &str) -> Result<Vec<FeedConfig>, PusherError> {
    let feeds: Vec<FeedConfig> = serde_yaml::from_str(raw)
        .map_err(|e| PusherError::Config(format!("invalid price config: {e}")))?;

    if feeds.is_empty() {
        return Err(PusherError::Config("price config lists no feeds".into()));
    }

    let mut seen = HashSet::new();
    for f in &feeds {
        if !seen.insert(f.id) {
            return Err(PusherError::Config(format!(
                "feed {} ({}) is listed more than once",
                f.alias, f.id
            )));
        }

        check_pct(&f.alias, "price_deviation", f.price_deviation_threshold_pct)?;
        check_pct(&f.alias, "confidence_ratio", f.confidence_ratio_threshold_pct)?;

        if let Some(EarlyUpdateConfig {
            price_deviation_threshold_pct,
            confidence_ratio_threshold_pct,
            ..
        }) = &f.early_update
        {
            if let Some(v) = price_deviation_threshold_pct {
                check_pct(&f.alias, "early_update.price_deviation", *v)?;
            }
            if let Some(v) = confidence_ratio_threshold_pct {
                check_pct(&f.alias, "early_update.confidence_ratio", *v)?;
            }
        }
    }

    Ok(feeds)
}

fn check_pct(alias: &str, field: &str, v: f64) -> Result<(), PusherError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(PusherError::Config(format!(
            "{alias}: {field} must be a non-negative number, got {v}"
        )))
    }
}
