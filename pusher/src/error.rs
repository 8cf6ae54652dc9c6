use thiserror::Error;

#[derive(Error, Debug)]
pub enum PusherError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid feed id: {0}")]
    InvalidFeedId(String),

    /// The signing account cannot pay for updates. Continuing would only repeat
    /// the same failure every tick, so this stops the scheduler.
    #[error("insufficient funds to pay for price updates: {0}")]
    InsufficientFunds(String),
}

impl PusherError {
    /// Whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InsufficientFunds(_))
    }
}
