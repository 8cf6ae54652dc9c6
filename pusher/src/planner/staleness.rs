//! Staleness evaluation.
//!
//! Decides from the latest source and target observations whether a feed must
//! be pushed on-chain. Pure apart from diagnostic events.
//!
//! Signals are measured against the target (on-chain) value:
//! - time difference   → how far the source is ahead of the target, in seconds
//! - price deviation   → |source − target| / |target|, in percent
//! - confidence ratio  → |source.conf / source.price|, in percent
//!
//! Any one signal reaching its threshold (inclusive) is enough.

use tracing::debug;

use crate::price::types::{EarlyUpdateConfig, FeedConfig, PriceObservation, UpdateCondition};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StalenessSignals {
    pub time_diff_secs: i64,
    pub price_deviation_pct: f64,
    pub confidence_ratio_pct: f64,
}

impl StalenessSignals {
    /// Callers must ensure `source` is not older than `target`.
    pub fn compute(source: &PriceObservation, target: &PriceObservation) -> Self {
        let time_diff_secs = source.publish_time - target.publish_time;

        // Deviation is relative to the on-chain price, confidence to the source price.
        let price_deviation_pct = ((source.price as f64 - target.price as f64).abs()
            / (target.price as f64).abs())
            * 100.0;
        let confidence_ratio_pct = (source.conf as f64 / source.price as f64).abs() * 100.0;

        Self {
            time_diff_secs,
            price_deviation_pct,
            confidence_ratio_pct,
        }
    }

    fn trips(
        &self,
        time_secs: Option<u64>,
        deviation_pct: Option<f64>,
        confidence_pct: Option<f64>,
    ) -> bool {
        let time = time_secs
            .is_some_and(|t| self.time_diff_secs >= 0 && self.time_diff_secs as u64 >= t);
        let deviation = deviation_pct.is_some_and(|d| self.price_deviation_pct >= d);
        let confidence = confidence_pct.is_some_and(|c| self.confidence_ratio_pct >= c);

        time || deviation || confidence
    }
}

/// Whether `config`'s main thresholds require pushing this feed.
pub fn needs_update(
    config: &FeedConfig,
    source: Option<&PriceObservation>,
    target: Option<&PriceObservation>,
) -> bool {
    update_condition(config, source, target) == UpdateCondition::Yes
}

/// Evaluates main thresholds first, then the optional early-update thresholds.
pub fn update_condition(
    config: &FeedConfig,
    source: Option<&PriceObservation>,
    target: Option<&PriceObservation>,
) -> UpdateCondition {
    let Some(source) = source else {
        debug!(alias = %config.alias, "no source price yet; nothing to push");
        return UpdateCondition::No;
    };

    let Some(target) = target else {
        debug!(alias = %config.alias, "feed not yet on-chain; pushing");
        return UpdateCondition::Yes;
    };

    if source.publish_time < target.publish_time {
        debug!(
            alias = %config.alias,
            source_publish_time = source.publish_time,
            target_publish_time = target.publish_time,
            "source is older than on-chain price"
        );
        return UpdateCondition::No;
    }

    let signals = StalenessSignals::compute(source, target);

    let condition = if signals.trips(
        Some(config.time_difference_threshold),
        Some(config.price_deviation_threshold_pct),
        Some(config.confidence_ratio_threshold_pct),
    ) {
        UpdateCondition::Yes
    } else if config.early_update.as_ref().is_some_and(|e| trips_early(&signals, e)) {
        UpdateCondition::Early
    } else {
        UpdateCondition::No
    };

    debug!(
        alias = %config.alias,
        source_price = source.scaled_price(),
        target_price = target.scaled_price(),
        time_diff_secs = signals.time_diff_secs,
        time_threshold = config.time_difference_threshold,
        price_deviation_pct = signals.price_deviation_pct,
        price_deviation_threshold = config.price_deviation_threshold_pct,
        confidence_ratio_pct = signals.confidence_ratio_pct,
        confidence_ratio_threshold = config.confidence_ratio_threshold_pct,
        ?condition,
        "staleness evaluated"
    );

    condition
}

fn trips_early(signals: &StalenessSignals, early: &EarlyUpdateConfig) -> bool {
    signals.trips(
        early.time_difference_threshold,
        early.price_deviation_threshold_pct,
        early.confidence_ratio_threshold_pct,
    )
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::price::types::FeedId;
    use proptest::prelude::*;

    fn feed(time: u64, dev: f64, conf: f64) -> FeedConfig {
        FeedConfig {
            alias: "P".into(),
            id: FeedId::new([0x11; 32]),
            time_difference_threshold: time,
            price_deviation_threshold_pct: dev,
            confidence_ratio_threshold_pct: conf,
            early_update: None,
        }
    }

    fn observation() -> impl Strategy<Value = PriceObservation> {
        (1..=1_000_000_000i64, 0..=1_000_000u64, 0..=2_000_000_000i64).prop_map(
            |(price, conf, publish_time)| PriceObservation {
                price,
                conf,
                expo: -8,
                publish_time,
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]
        #[test]
        fn absent_source_never_updates(
            target in proptest::option::of(observation()),
            time in 0..=10_000u64,
            dev in 0.0..=100.0f64,
            conf in 0.0..=100.0f64,
        ) {
            prop_assert!(!needs_update(&feed(time, dev, conf), None, target.as_ref()));
        }

        #[test]
        fn absent_target_always_updates(
            source in observation(),
            time in 0..=10_000u64,
            dev in 0.0..=100.0f64,
            conf in 0.0..=100.0f64,
        ) {
            prop_assert!(needs_update(&feed(time, dev, conf), Some(&source), None));
        }

        #[test]
        fn older_source_never_updates(
            mut source in observation(),
            target in observation(),
            lag in 1..=100_000i64,
            time in 0..=10_000u64,
            dev in 0.0..=100.0f64,
            conf in 0.0..=100.0f64,
        ) {
            source.publish_time = target.publish_time - lag;
            prop_assert!(!needs_update(&feed(time, dev, conf), Some(&source), Some(&target)));
        }

        #[test]
        fn decision_is_or_of_signals(
            mut source in observation(),
            target in observation(),
            ahead in 0..=20_000i64,
            time in 0..=10_000u64,
            dev in 0.0..=100.0f64,
            conf in 0.0..=100.0f64,
        ) {
            source.publish_time = target.publish_time + ahead;
            let s = StalenessSignals::compute(&source, &target);
            let expected = s.time_diff_secs as u64 >= time
                || s.price_deviation_pct >= dev
                || s.confidence_ratio_pct >= conf;

            prop_assert_eq!(
                needs_update(&feed(time, dev, conf), Some(&source), Some(&target)),
                expected
            );
        }
    }
}
