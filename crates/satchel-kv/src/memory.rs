//! In-memory store backend used by tests.

use crate::{BatchOp, IterOptions, KeyValue, Result, WriteBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

/// A `BTreeMap`-backed [`KeyValue`] implementation.
///
/// Batches are applied under a single write guard, so readers observe either
/// none or all of a batch. Suitable for tests and tooling, not for durable
/// storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently present.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Snapshot of every entry, in key order.
    pub fn dump(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.map
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl KeyValue for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.map.read().contains_key(key))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut map = self.map.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    map.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn iterate(&self, opts: IterOptions) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if opts.gte > opts.lte {
            return Ok(Vec::new());
        }

        let map = self.map.read();
        let range = map.range::<[u8], _>((
            Bound::Included(opts.gte.as_slice()),
            Bound::Included(opts.lte.as_slice()),
        ));

        let entry = |(k, v): (&Vec<u8>, &Vec<u8>)| {
            let value = if opts.values { v.clone() } else { Vec::new() };
            (k.clone(), value)
        };

        let limit = opts.limit.unwrap_or(usize::MAX);
        let out = if opts.reverse {
            range.rev().take(limit).map(entry).collect()
        } else {
            range.take(limit).map(entry).collect()
        };

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> MemoryStore {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        for key in ["a/1", "a/2", "a/3", "b/1", "b/2"] {
            batch.put(key.as_bytes().to_vec(), key.as_bytes().to_vec());
        }
        store.write(batch).unwrap();
        store
    }

    #[test]
    fn test_batch_applies_puts_and_deletes() {
        let store = populated();
        assert!(store.has(b"a/2").unwrap());

        let mut batch = WriteBatch::new();
        batch.delete(b"a/2".to_vec());
        batch.put(b"a/4".to_vec(), b"x".to_vec());
        store.write(batch).unwrap();

        assert!(!store.has(b"a/2").unwrap());
        assert_eq!(store.get(b"a/4").unwrap(), Some(b"x".to_vec()));
    }

    #[test]
    fn test_iterate_bounds_are_inclusive() {
        let store = populated();
        let entries = store
            .iterate(IterOptions::range(b"a/1".to_vec(), b"a/3".to_vec()))
            .unwrap();
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![b"a/1".to_vec(), b"a/2".to_vec(), b"a/3".to_vec()]);
    }

    #[test]
    fn test_iterate_prefix_with_sentinel_upper_bound() {
        let store = populated();
        // "a/" .. "a/~" covers every key under the "a/" prefix.
        let entries = store
            .iterate(IterOptions::keys(b"a/".to_vec(), b"a/~".to_vec()))
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|(_, v)| v.is_empty()));
    }

    #[test]
    fn test_iterate_reverse_and_limit() {
        let store = populated();
        let entries = store
            .iterate(
                IterOptions::range(b"a/".to_vec(), b"b/~".to_vec())
                    .reversed(true)
                    .with_limit(Some(2)),
            )
            .unwrap();
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![b"b/2".to_vec(), b"b/1".to_vec()]);
    }

    #[test]
    fn test_iterate_inverted_bounds_is_empty() {
        let store = populated();
        let entries = store
            .iterate(IterOptions::range(b"z".to_vec(), b"a".to_vec()))
            .unwrap();
        assert!(entries.is_empty());
    }
}
