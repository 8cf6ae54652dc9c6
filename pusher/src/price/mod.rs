pub mod listener;
pub mod poller;
pub mod types;

pub use listener::{PriceListener, PriceSnapshotStore};
pub use poller::{PriceFetcher, run_price_poller};
pub use types::{EarlyUpdateConfig, FeedConfig, FeedId, PriceObservation, UpdateCondition};
