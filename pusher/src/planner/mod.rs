pub mod batch;
pub mod staleness;
pub mod types;

pub use batch::select_batch;
pub use staleness::{StalenessSignals, needs_update, update_condition};
pub use types::{PushBatch, PushItem};
