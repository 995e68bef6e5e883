//! RocksDB store backend.

use crate::{BatchOp, IterOptions, KeyValue, Result, WriteBatch};
use rocksdb::{Options, DB};
use std::path::Path;

/// RocksDB-backed [`KeyValue`] implementation.
///
/// The whole wallet keyspace lives in the default column family: keys carry
/// their own role prefixes, so the store stays a single flat ordered
/// namespace.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);

        // Wallet workload: small values, bursty batches.
        db_opts.set_write_buffer_size(64 * 1024 * 1024);
        db_opts.set_max_write_buffer_number(4);
        db_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&db_opts, path)?;

        tracing::info!("Opened wallet store at {}", path.display());

        Ok(Self { db })
    }
}

impl KeyValue for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut inner = rocksdb::WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => inner.put(key, value),
                BatchOp::Delete { key } => inner.delete(key),
            }
        }
        self.db.write(inner)?;
        Ok(())
    }

    fn iterate(&self, opts: IterOptions) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if opts.gte > opts.lte {
            return Ok(Vec::new());
        }

        let limit = opts.limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        let mut iter = self.db.raw_iterator();

        if opts.reverse {
            iter.seek_for_prev(&opts.lte);
        } else {
            iter.seek(&opts.gte);
        }

        while iter.valid() && out.len() < limit {
            let key = match iter.key() {
                Some(key) => key,
                None => break,
            };
            let in_bounds = if opts.reverse {
                key >= opts.gte.as_slice()
            } else {
                key <= opts.lte.as_slice()
            };
            if !in_bounds {
                break;
            }

            let value = if opts.values {
                iter.value().map(<[u8]>::to_vec).unwrap_or_default()
            } else {
                Vec::new()
            };
            out.push((key.to_vec(), value));

            if opts.reverse {
                iter.prev();
            } else {
                iter.next();
            }
        }
        iter.status()?;

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_scan_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();

        let mut batch = WriteBatch::new();
        batch.put(b"t/aa".to_vec(), b"1".to_vec());
        batch.put(b"t/bb".to_vec(), b"2".to_vec());
        batch.put(b"u/cc".to_vec(), b"3".to_vec());
        store.write(batch).unwrap();

        assert_eq!(store.get(b"t/bb").unwrap(), Some(b"2".to_vec()));

        let entries = store
            .iterate(IterOptions::range(b"t/".to_vec(), b"t/~".to_vec()))
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, b"t/aa".to_vec());

        let reversed = store
            .iterate(
                IterOptions::keys(b"t/".to_vec(), b"t/~".to_vec())
                    .reversed(true)
                    .with_limit(Some(1)),
            )
            .unwrap();
        assert_eq!(reversed.len(), 1);
        assert_eq!(reversed[0].0, b"t/bb".to_vec());
    }

    #[test]
    fn test_delete_in_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();

        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"v".to_vec());
        store.write(batch).unwrap();

        let mut batch = WriteBatch::new();
        batch.delete(b"k".to_vec());
        store.write(batch).unwrap();

        assert!(!store.has(b"k").unwrap());
    }
}
