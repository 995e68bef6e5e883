//! Bounded LRU cache of serialized coin records.

use bitcoin::OutPoint;
use schnellru::{ByLength, LruMap};

/// A cache mutation staged by a batch session and applied only after the
/// batch commits, so dropped batches never poison the cache.
#[derive(Debug, Clone)]
pub enum CacheOp {
    Insert(OutPoint, Vec<u8>),
    Evict(OutPoint),
}

/// LRU of outpoint → serialized coin bytes.
///
/// Entries hold the exact representation persisted under `c/`, so readers
/// share bytes with the store. Reads may fill the cache from committed
/// state; all other writes arrive through [`CacheOp`]s after a commit.
pub struct CoinCache {
    map: LruMap<OutPoint, Vec<u8>, ByLength>,
}

impl CoinCache {
    pub fn new(capacity: u32) -> Self {
        Self {
            map: LruMap::new(ByLength::new(capacity)),
        }
    }

    pub fn get(&mut self, outpoint: &OutPoint) -> Option<Vec<u8>> {
        self.map.get(outpoint).map(|bytes| bytes.clone())
    }

    pub fn insert(&mut self, outpoint: OutPoint, bytes: Vec<u8>) {
        self.map.insert(outpoint, bytes);
    }

    pub fn evict(&mut self, outpoint: &OutPoint) {
        self.map.remove(outpoint);
    }

    pub fn apply(&mut self, op: CacheOp) {
        match op {
            CacheOp::Insert(outpoint, bytes) => self.insert(outpoint, bytes),
            CacheOp::Evict(outpoint) => self.evict(&outpoint),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.len() == 0
    }
}
