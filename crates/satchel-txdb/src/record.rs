//! Extended transaction record, the value stored under `t/<hash>`.

use crate::coin::UNCONFIRMED_HEIGHT;
use crate::error::{Error, Result};
use bitcoin::{BlockHash, Transaction, Txid};
use serde::{Deserialize, Serialize};

/// Where and when a transaction was mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Block height.
    pub height: u32,
    /// Block hash.
    pub hash: BlockHash,
    /// Position of the transaction within the block.
    pub index: u32,
    /// Block timestamp. Must be nonzero: a zero `ts` encodes "unconfirmed".
    pub time: u64,
}

/// Caller-supplied context for an inbound transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxContext {
    /// Mined location, or `None` for an unconfirmed transaction.
    pub block: Option<BlockContext>,
    /// When the wallet first saw the transaction (`ps`).
    pub received: u64,
}

impl TxContext {
    pub fn unconfirmed(received: u64) -> Self {
        Self {
            block: None,
            received,
        }
    }

    pub fn confirmed(block: BlockContext, received: u64) -> Self {
        Self {
            block: Some(block),
            received,
        }
    }
}

/// A transaction with its wallet metadata.
///
/// Invariant: `ts == 0 ⇔ height == -1 ⇔ unconfirmed`. Once `ts != 0`,
/// `height >= 0` and `block` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx: Transaction,
    /// Block height, `-1` while unconfirmed.
    pub height: i32,
    /// Block hash, `None` while unconfirmed.
    pub block: Option<BlockHash>,
    /// Position within the block, `-1` while unconfirmed.
    pub index: i32,
    /// Block timestamp, `0` while unconfirmed.
    pub ts: u64,
    /// When the wallet first saw the transaction.
    pub ps: u64,
}

impl TxRecord {
    pub fn new(tx: Transaction, context: TxContext) -> Self {
        match context.block {
            Some(block) => {
                debug_assert!(block.time != 0, "confirmed context with zero timestamp");
                Self {
                    tx,
                    height: block.height as i32,
                    block: Some(block.hash),
                    index: block.index as i32,
                    ts: block.time,
                    ps: context.received,
                }
            }
            None => Self {
                tx,
                height: -1,
                block: None,
                index: -1,
                ts: 0,
                ps: context.received,
            },
        }
    }

    pub fn txid(&self) -> Txid {
        self.tx.compute_txid()
    }

    pub fn is_confirmed(&self) -> bool {
        self.ts != 0
    }

    /// Height to store on this record's coins.
    pub fn coin_height(&self) -> u32 {
        if self.height < 0 {
            UNCONFIRMED_HEIGHT
        } else {
            self.height as u32
        }
    }

    /// Mark the record as mined, preserving the original `ps`.
    pub fn confirm(&mut self, block: BlockContext) {
        debug_assert!(block.time != 0, "confirming with zero timestamp");
        self.height = block.height as i32;
        self.block = Some(block.hash);
        self.index = block.index as i32;
        self.ts = block.time;
    }

    /// Return the record to the unconfirmed state, preserving `ps`.
    pub fn unconfirm(&mut self) {
        self.height = -1;
        self.block = None;
        self.index = -1;
        self.ts = 0;
    }

    /// Serialize to bytes for storage.
    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("transaction record serialization should not fail")
    }

    /// Deserialize from bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Corrupt {
            key: String::new(),
            reason: e.to_string(),
        })
    }
}
