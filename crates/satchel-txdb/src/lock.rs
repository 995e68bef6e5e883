//! Per-wallet serialization lock.
//!
//! All mutations of one index pass through this lock, which grants the
//! critical section in strict FIFO order. On top of mutual exclusion it
//! tracks the set of transaction hashes with a queued or running `add`
//! (the pending set) and runs one-shot drain waiters whenever that set
//! empties.
//!
//! Re-entrant paths (recursive removal during conflict resolution) use
//! [`SerialLock::force`], which asserts the lock is already held and yields
//! a guard whose release is a no-op.

use crate::error::{Error, Result};
use bitcoin::Txid;
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;

type DrainWaiter = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct LockState {
    held: bool,
    next_ticket: u64,
    serving: u64,
    pending: HashSet<Txid>,
    drain_waiters: Vec<DrainWaiter>,
    destroyed: bool,
}

/// FIFO mutex with a pending-transaction set for backpressure signalling.
#[derive(Default)]
pub struct SerialLock {
    state: Mutex<LockState>,
    available: Condvar,
}

impl SerialLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a plain mutation.
    pub fn acquire(&self) -> Result<LockGuard<'_>> {
        self.acquire_inner(None)
    }

    /// Acquire the lock for an `add`-shaped mutation. The transaction hash
    /// joins the pending set at enqueue time and leaves it when the guard
    /// is released.
    pub fn acquire_tx(&self, txid: Txid) -> Result<LockGuard<'_>> {
        self.acquire_inner(Some(txid))
    }

    fn acquire_inner(&self, txid: Option<Txid>) -> Result<LockGuard<'_>> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(Error::Destroyed);
        }
        if let Some(txid) = txid {
            state.pending.insert(txid);
        }
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        while state.serving != ticket {
            self.available.wait(&mut state);
            if state.destroyed {
                return Err(Error::Destroyed);
            }
        }
        state.held = true;
        Ok(LockGuard {
            lock: self,
            txid,
            reentrant: false,
        })
    }

    /// Re-enter a lock that is already held by an ancestor frame.
    ///
    /// # Panics
    ///
    /// Panics if the lock is not currently held; forcing an idle lock is a
    /// programming error.
    pub fn force(&self) -> LockGuard<'_> {
        let state = self.state.lock();
        assert!(state.held, "forced a serial lock that is not held");
        LockGuard {
            lock: self,
            txid: None,
            reentrant: true,
        }
    }

    /// Install a one-shot waiter that runs once the pending set is empty.
    /// Runs immediately when it already is.
    pub fn on_drain(&self, waiter: impl FnOnce() + Send + 'static) {
        let mut slot = Some(waiter);
        {
            let mut state = self.state.lock();
            if !state.destroyed && !state.pending.is_empty() {
                state
                    .drain_waiters
                    .push(Box::new(slot.take().expect("waiter set above")));
            }
        }
        if let Some(waiter) = slot {
            waiter();
        }
    }

    /// True when no `add` is queued or running.
    pub fn is_drained(&self) -> bool {
        self.state.lock().pending.is_empty()
    }

    /// Number of queued or running `add`s.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Tear down the lock: queued jobs are refused, the pending set and
    /// drain waiters are cleared. A job already holding the lock runs to
    /// completion.
    pub fn destroy(&self) {
        let mut state = self.state.lock();
        state.destroyed = true;
        state.pending.clear();
        state.drain_waiters.clear();
        self.available.notify_all();
    }
}

/// Release token for one critical section. Dropping it dispatches the next
/// queued job; dropping a re-entrant guard does nothing.
pub struct LockGuard<'a> {
    lock: &'a SerialLock,
    txid: Option<Txid>,
    reentrant: bool,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.reentrant {
            return;
        }
        let waiters = {
            let mut state = self.lock.state.lock();
            state.held = false;
            state.serving += 1;
            if let Some(txid) = self.txid.take() {
                state.pending.remove(&txid);
            }
            let waiters = if state.pending.is_empty() {
                std::mem::take(&mut state.drain_waiters)
            } else {
                Vec::new()
            };
            self.lock.available.notify_all();
            waiters
        };
        for waiter in waiters {
            waiter();
        }
    }
}
