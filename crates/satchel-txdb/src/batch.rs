//! Per-operation batch session.
//!
//! One logical mutation stages all of its puts and deletes here and either
//! commits them atomically or drops them. The session also carries the
//! side effects that must wait for a durable commit: coin-cache updates and
//! events. A staged-read overlay lets the mutation observe its own writes
//! before they hit the store.

use crate::cache::CacheOp;
use crate::events::Event;
use satchel_kv::WriteBatch;
use std::collections::HashMap;

pub(crate) struct Session {
    batch: WriteBatch,
    /// Read-your-writes overlay: `Some` for staged puts, `None` for staged
    /// deletes.
    staged: HashMap<Vec<u8>, Option<Vec<u8>>>,
    cache_ops: Vec<CacheOp>,
    events: Vec<Event>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            batch: WriteBatch::new(),
            staged: HashMap::new(),
            cache_ops: Vec::new(),
            events: Vec::new(),
        }
    }

    pub(crate) fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.staged.insert(key.clone(), Some(value.clone()));
        self.batch.put(key, value);
    }

    pub(crate) fn delete(&mut self, key: Vec<u8>) {
        self.staged.insert(key.clone(), None);
        self.batch.delete(key);
    }

    /// Staged state of a key: `None` if untouched by this session,
    /// `Some(None)` if staged for deletion, `Some(Some(v))` if staged.
    pub(crate) fn staged(&self, key: &[u8]) -> Option<Option<Vec<u8>>> {
        self.staged.get(key).cloned()
    }

    /// Stage a cache update to apply after commit.
    pub(crate) fn cache(&mut self, op: CacheOp) {
        self.cache_ops.push(op);
    }

    /// Stage an event to emit after commit.
    pub(crate) fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn into_parts(self) -> (WriteBatch, Vec<CacheOp>, Vec<Event>) {
        (self.batch, self.cache_ops, self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_reflects_staged_writes() {
        let mut session = Session::new();
        assert_eq!(session.staged(b"k"), None);

        session.put(b"k".to_vec(), b"v".to_vec());
        assert_eq!(session.staged(b"k"), Some(Some(b"v".to_vec())));

        session.delete(b"k".to_vec());
        assert_eq!(session.staged(b"k"), Some(None));
    }

    #[test]
    fn test_into_parts_preserves_order() {
        let mut session = Session::new();
        session.put(b"a".to_vec(), b"1".to_vec());
        session.delete(b"b".to_vec());
        session.emit(Event::Drain);

        let (batch, cache_ops, events) = session.into_parts();
        assert_eq!(batch.len(), 2);
        assert!(cache_ops.is_empty());
        assert_eq!(events.len(), 1);
    }
}
