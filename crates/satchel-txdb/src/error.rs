//! Error types for the transaction index.

use bitcoin::Txid;

/// Errors surfaced by index operations.
///
/// Rejection of an incoming transaction (failed verification, conflict
/// arbitration keeping the existing spender) is not an error; it is reported
/// through [`crate::AddOutcome::Rejected`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend store error. The in-flight session is dropped.
    #[error("store error: {0}")]
    Store(#[from] satchel_kv::StoreError),

    /// A record the index relies on is missing. Signals a bug or external
    /// tampering with the keyspace.
    #[error("missing expected record: {0}")]
    Missing(String),

    /// A persisted record failed to decode.
    #[error("corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// `abandon` was called for a transaction that is not pending.
    #[error("transaction {0} is not pending")]
    NotPending(Txid),

    /// A negative height was passed for a key that requires a non-negative
    /// value.
    #[error("negative height {0} for a height-indexed key")]
    NegativeHeight(i64),

    /// The index was destroyed; queued and future mutations are refused.
    #[error("index destroyed")]
    Destroyed,
}

impl Error {
    pub(crate) fn corrupt(key: &[u8], reason: impl ToString) -> Self {
        Self::Corrupt {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: reason.to_string(),
        }
    }

    /// Attach the offending key to a corruption error.
    pub(crate) fn with_key(self, key: &[u8]) -> Self {
        match self {
            Self::Corrupt { reason, .. } => Self::corrupt(key, reason),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
