use std::fmt;
use std::time::Duration;

/// Verifiable price update data returned by the price service, one entry per
/// encoded update message. Opaque to everything except the chain contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdatePayload {
    pub updates: Vec<Vec<u8>>,
}

impl UpdatePayload {
    pub fn new(updates: Vec<Vec<u8>>) -> Self {
        Self { updates }
    }

    /// Total size in bytes.
    pub fn size(&self) -> usize {
        self.updates.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Non-fatal result of one push attempt.
///
/// Insufficient funds is deliberately absent: it is returned as an error so it
/// cannot be mistaken for an outcome the scheduler may continue past.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// Nothing needed updating.
    NoOp,
    /// The update payload could not be fetched; nothing was submitted.
    FetchFailed { reason: String },
    Accepted { tx_hash: String },
    /// Another pusher already published prices at least this fresh.
    AlreadyFresh,
    /// Another sender on the same account took the nonce.
    NonceConflict,
    /// Unrecognized failure (including timeouts); retried on the next tick.
    Unknown { detail: String },
}

impl PushOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoOp => "noop",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::Accepted { .. } => "accepted",
            Self::AlreadyFresh => "already_fresh",
            Self::NonceConflict => "nonce_conflict",
            Self::Unknown { .. } => "unknown_error",
        }
    }
}

impl fmt::Display for PushOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchFailed { reason } => write!(f, "{}: {reason}", self.label()),
            Self::Accepted { tx_hash } => write!(f, "{}: {tx_hash}", self.label()),
            Self::Unknown { detail } => write!(f, "{}: {detail}", self.label()),
            _ => f.write_str(self.label()),
        }
    }
}

/// Bounds on the network calls made during one push.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineTimeouts {
    /// Update payload fetch from the price service.
    pub fetch: Duration,
    /// Each chain call (fee estimate and submission).
    pub chain: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            fetch: Duration::from_secs(10),
            chain: Duration::from_secs(60),
        }
    }
}
