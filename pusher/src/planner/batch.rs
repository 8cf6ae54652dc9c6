use tracing::{debug, info, instrument, warn};

use crate::planner::staleness::update_condition;
use crate::planner::types::{PushBatch, PushItem};
use crate::price::listener::PriceListener;
use crate::price::types::{FeedConfig, UpdateCondition};

/// Selects the feeds to push this tick.
///
/// Each feed's source and target observations are read exactly once; the
/// target publish time read here becomes the batch baseline (`+1`, or `1` when
/// the feed was never seen on-chain) so later listener updates cannot change
/// what the submission is checked against.
///
/// Feeds that only meet their early-update thresholds are added when at least
/// one feed must be pushed. Order follows `configs`; duplicate ids keep the
/// first occurrence.
#[instrument(target = "planner", skip_all, fields(feed_count = configs.len()))]
pub fn select_batch(
    configs: &[FeedConfig],
    source: &dyn PriceListener,
    target: &dyn PriceListener,
) -> PushBatch {
    let mut decided = Vec::with_capacity(configs.len());

    for cfg in configs {
        let src = source.latest(&cfg.id);
        let tgt = target.latest(&cfg.id);

        let condition = update_condition(cfg, src.as_ref(), tgt.as_ref());
        let baseline = tgt.map(|t| t.publish_time).unwrap_or(0) + 1;

        decided.push((cfg, condition, baseline));
    }

    let any_required = decided.iter().any(|(_, c, _)| *c == UpdateCondition::Yes);

    let mut batch = PushBatch::new();
    for (cfg, condition, baseline) in decided {
        let include = match condition {
            UpdateCondition::Yes => true,
            UpdateCondition::Early => any_required,
            UpdateCondition::No => false,
        };
        if !include {
            continue;
        }

        let added = batch.push(PushItem {
            config: cfg.clone(),
            baseline_publish_time: baseline,
        });

        if !added {
            warn!(alias = %cfg.alias, id = %cfg.id, "duplicate feed in configuration; skipped");
            continue;
        }

        debug!(alias = %cfg.alias, ?condition, baseline, "feed selected for push");
    }

    if batch.is_empty() {
        debug!("all feeds fresh");
    } else {
        info!(selected = batch.len(), aliases = ?batch.aliases(), "feeds need update");
    }

    batch
}
