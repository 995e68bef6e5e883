//! Error types for the store backends.

/// Errors surfaced by a [`crate::KeyValue`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// RocksDB error.
    #[error("RocksDB error: {0}")]
    Rocksdb(#[from] rocksdb::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure that is not an IO or engine error.
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
