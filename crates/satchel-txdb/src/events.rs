//! Index events.
//!
//! Events fire after the batch that produced them has committed, in commit
//! order. The outer wallet database installs a sink to fan them out.

use crate::path::PathInfo;
use crate::record::TxRecord;

/// A committed state change.
#[derive(Debug, Clone)]
pub enum Event {
    /// A transaction was inserted.
    Tx { record: TxRecord, info: PathInfo },
    /// A transaction gained a block.
    Confirmed { record: TxRecord, info: PathInfo },
    /// A transaction lost its block in a reorg.
    Unconfirmed { record: TxRecord, info: PathInfo },
    /// A double-spend loser was evicted in favour of another spender.
    Conflict { record: TxRecord, info: PathInfo },
    /// A transaction was removed from the index.
    Removed { record: TxRecord, info: PathInfo },
    /// The add queue became empty.
    Drain,
}

/// Receiver for committed events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Sink that discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}
