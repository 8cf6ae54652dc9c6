pub mod pipeline;
pub mod types;

pub use pipeline::{ChainSubmitter, PushPipeline, UpdateDataSource};
pub use types::{PipelineTimeouts, PushOutcome, UpdatePayload};
