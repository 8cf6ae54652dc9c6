use thiserror::Error;

/// 4-byte selector of the contract's `NoFreshUpdate()` custom error.
pub const NO_FRESH_UPDATE_SELECTOR: [u8; 4] = [0xde, 0x2c, 0x57, 0xfa];

/// Submission failures, normalized at the chain adapter.
///
/// Nothing outside the adapter looks at raw client error text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// No feed in the update is newer than the on-chain baseline; another
    /// pusher got there first.
    #[error("no fresh update: on-chain prices are already as new as the payload")]
    NoFreshUpdate,

    /// Another sender sharing the account used the same nonce.
    #[error("nonce conflict: {0}")]
    NonceConflict(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("{0}")]
    Other(String),
}

impl ChainError {
    /// Classifies from a revert payload when the node returned one, falling
    /// back to the error text.
    pub fn classify(revert_data: Option<&[u8]>, message: &str) -> Self {
        if let Some(data) = revert_data {
            if data.starts_with(&NO_FRESH_UPDATE_SELECTOR) {
                return Self::NoFreshUpdate;
            }
        }
        Self::from_message(message)
    }

    /// Message matching for clients that only expose error strings.
    ///
    /// Brittle across client and node versions; anything unrecognized stays `Other`.
    pub fn from_message(message: &str) -> Self {
        let m = message.to_ascii_lowercase();

        if m.contains("nofreshupdate")
            || m.contains("0xde2c57fa")
            || m.contains("no prices in the submitted batch have fresh data")
        {
            return Self::NoFreshUpdate;
        }
        if m.contains("nonce too low")
            || m.contains("replacement transaction underpriced")
            || m.contains("already known")
            || m.contains("nonce has already been used")
            || m.contains("doesn't have the correct nonce")
        {
            return Self::NonceConflict(message.to_string());
        }
        if m.contains("insufficient funds")
            || m.contains("enough funds")
            || m.contains("insufficient balance")
        {
            return Self::InsufficientFunds(message.to_string());
        }

        Self::Other(message.to_string())
    }
}
