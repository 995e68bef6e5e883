//! The wallet transaction index.
//!
//! [`TxDb`] tracks every transaction touching one wallet, the coins it
//! owns, and the links between them. Mutations (`add`, `confirm`,
//! `unconfirm`, `remove`, `zap`, `abandon`) are serialized through a
//! per-wallet FIFO lock and applied as atomic batches; queries (see
//! `query.rs`) read the committed keyspace directly.

use crate::address::{input_address, output_address};
use crate::batch::Session;
use crate::cache::{CacheOp, CoinCache};
use crate::coin::Coin;
use crate::conflict::{arbitrate, Arbitration};
use crate::error::{Error, Result};
use crate::events::{Event, EventSink, NullSink};
use crate::layout::Layout;
use crate::lock::SerialLock;
use crate::orphan::{OrphanList, Spender};
use crate::path::{coin_account, AddressBook, PathInfo};
use crate::record::{BlockContext, TxContext, TxRecord};
use bitcoin::{OutPoint, Transaction, Txid};
use parking_lot::Mutex;
use satchel_kv::{IterOptions, KeyValue};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Script verification capability. External collaborator; when absent,
/// inputs are accepted without script checks.
pub trait InputVerifier: Send + Sync {
    /// Verify input `index` of `tx` against the coin it spends.
    fn verify_input(&self, tx: &Transaction, index: usize, coin: &Coin) -> bool;
}

/// Outcome of [`TxDb::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The transaction was inserted.
    Added,
    /// The transaction was already indexed. `confirmed` is true when this
    /// call promoted it from pending to confirmed.
    Exists { confirmed: bool },
    /// The transaction was not inserted: an input failed verification or
    /// conflict arbitration kept the existing spender. Not an error.
    Rejected,
}

/// Construction options for a [`TxDb`].
#[derive(Debug, Clone, Copy)]
pub struct TxDbOptions {
    /// Wallet id scoping every key of this index.
    pub wallet_id: u32,
    /// Capacity of the coin cache, in entries.
    pub coin_cache: u32,
}

impl Default for TxDbOptions {
    fn default() -> Self {
        Self {
            wallet_id: 0,
            coin_cache: 8192,
        }
    }
}

/// Per-wallet persistent transaction and coin index.
pub struct TxDb {
    pub(crate) store: Arc<dyn KeyValue>,
    pub(crate) layout: Layout,
    pub(crate) cache: Mutex<CoinCache>,
    pub(crate) lock: SerialLock,
    pub(crate) session: Mutex<Option<Session>>,
    pub(crate) book: Arc<dyn AddressBook>,
    pub(crate) verifier: Option<Arc<dyn InputVerifier>>,
    pub(crate) sink: Arc<dyn EventSink>,
}

impl TxDb {
    pub fn new(store: Arc<dyn KeyValue>, book: Arc<dyn AddressBook>, options: TxDbOptions) -> Self {
        Self {
            store,
            layout: Layout::new(options.wallet_id),
            cache: Mutex::new(CoinCache::new(options.coin_cache)),
            lock: SerialLock::new(),
            session: Mutex::new(None),
            book,
            verifier: None,
            sink: Arc::new(NullSink),
        }
    }

    /// Enable script verification of wallet inputs.
    pub fn with_verifier(mut self, verifier: Arc<dyn InputVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Install an event sink. The sink must not call back into mutations of
    /// this index synchronously.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Resolve the path info for a transaction against the wallet's
    /// address book.
    pub fn path_info(&self, tx: &Transaction) -> PathInfo {
        PathInfo::from_tx(tx, &*self.book)
    }

    /// Install a one-shot waiter for the add queue becoming empty.
    pub fn on_drain(&self, waiter: impl FnOnce() + Send + 'static) {
        self.lock.on_drain(waiter);
    }

    /// Number of queued or running `add`s.
    pub fn pending_adds(&self) -> usize {
        self.lock.pending_count()
    }

    /// Tear down the index: queued mutations are refused and the pending
    /// set is cleared. The mutation currently holding the lock finishes.
    pub fn destroy(&self) {
        self.lock.destroy();
    }

    // ── Batch session ───────────────────────────────────────────────────

    fn start(&self) {
        let mut slot = self.session.lock();
        assert!(slot.is_none(), "batch session already open");
        *slot = Some(Session::new());
    }

    fn stage(&self, f: impl FnOnce(&mut Session)) {
        let mut slot = self.session.lock();
        f(slot.as_mut().expect("no open batch session"));
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) {
        self.stage(|session| session.put(key, value));
    }

    fn del(&self, key: Vec<u8>) {
        self.stage(|session| session.delete(key));
    }

    fn cache_op(&self, op: CacheOp) {
        self.stage(|session| session.cache(op));
    }

    fn queue_event(&self, event: Event) {
        self.stage(|session| session.emit(event));
    }

    fn commit(&self) -> Result<()> {
        let session = self
            .session
            .lock()
            .take()
            .expect("no open batch session to commit");
        let (batch, cache_ops, events) = session.into_parts();
        self.store.write(batch)?;
        {
            let mut cache = self.cache.lock();
            for op in cache_ops {
                cache.apply(op);
            }
        }
        for event in events {
            self.sink.emit(event);
        }
        Ok(())
    }

    fn drop_session(&self) {
        self.session.lock().take();
    }

    /// Run one staged mutation: open a session, stage through `f`, commit.
    /// On error the session is dropped and nothing is written.
    fn in_session(&self, f: impl FnOnce(&Self) -> Result<()>) -> Result<()> {
        self.start();
        match f(self) {
            Ok(()) => self.commit(),
            Err(e) => {
                self.drop_session();
                Err(e)
            }
        }
    }

    // ── Overlay-aware reads (mutation paths) ────────────────────────────

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(session) = self.session.lock().as_ref() {
            if let Some(staged) = session.staged(key) {
                return Ok(staged);
            }
        }
        Ok(self.store.get(key)?)
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        if let Some(session) = self.session.lock().as_ref() {
            if let Some(staged) = session.staged(key) {
                return Ok(staged.is_some());
            }
        }
        Ok(self.store.has(key)?)
    }

    fn load_record(&self, txid: &Txid) -> Result<Option<TxRecord>> {
        let key = self.layout.tx(txid);
        match self.read(&key)? {
            Some(bytes) => TxRecord::decode(&bytes)
                .map(Some)
                .map_err(|e| e.with_key(&key)),
            None => Ok(None),
        }
    }

    fn load_coin_bytes(&self, outpoint: &OutPoint) -> Result<Option<Vec<u8>>> {
        let key = self.layout.coin(&outpoint.txid, outpoint.vout);
        if let Some(session) = self.session.lock().as_ref() {
            if let Some(staged) = session.staged(&key) {
                return Ok(staged);
            }
        }
        if let Some(bytes) = self.cache.lock().get(outpoint) {
            return Ok(Some(bytes));
        }
        let bytes = self.store.get(&key)?;
        if let Some(bytes) = &bytes {
            self.cache.lock().insert(*outpoint, bytes.clone());
        }
        Ok(bytes)
    }

    fn load_coin(&self, outpoint: &OutPoint) -> Result<Option<Coin>> {
        match self.load_coin_bytes(outpoint)? {
            Some(bytes) => Coin::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn spender_of(&self, outpoint: &OutPoint) -> Result<Option<Spender>> {
        let key = self.layout.spent(&outpoint.txid, outpoint.vout);
        match self.read(&key)? {
            Some(bytes) => Spender::decode(&bytes)
                .map(Some)
                .map_err(|e| e.with_key(&key)),
            None => Ok(None),
        }
    }

    // ── add ─────────────────────────────────────────────────────────────

    /// Insert a transaction, or promote an already-indexed one to
    /// confirmed.
    ///
    /// `info` is the pre-computed address-to-path mapping for `tx` (see
    /// [`TxDb::path_info`]).
    pub fn add(&self, tx: Transaction, context: TxContext, info: &PathInfo) -> Result<AddOutcome> {
        let txid = tx.compute_txid();
        let guard = self.lock.acquire_tx(txid)?;
        let result = self.add_locked(tx, context, info);
        if result.is_err() {
            self.drop_session();
        }
        drop(guard);
        if result.is_ok() && self.lock.is_drained() {
            self.sink.emit(Event::Drain);
        }
        result
    }

    fn add_locked(&self, tx: Transaction, context: TxContext, info: &PathInfo) -> Result<AddOutcome> {
        let txid = tx.compute_txid();

        if let Some(existing) = self.load_record(&txid)? {
            let confirmed = match context.block {
                Some(block) if !existing.is_confirmed() => {
                    self.confirm_record(existing, block, info)?;
                    true
                }
                _ => false,
            };
            return Ok(AddOutcome::Exists { confirmed });
        }

        let incoming = TxRecord::new(tx, context);
        let resolved = match self.verify_inputs(&incoming, info)? {
            Some(resolved) => resolved,
            None => return Ok(AddOutcome::Rejected),
        };

        self.insert(incoming, info, resolved)?;
        Ok(AddOutcome::Added)
    }

    /// Resolve and verify the wallet's inputs.
    ///
    /// Returns the coins resolved per input index, or `None` when the
    /// transaction must be rejected. Inputs whose referenced output is
    /// unknown stay unresolved and are registered as orphans at insert
    /// time.
    fn verify_inputs(
        &self,
        incoming: &TxRecord,
        info: &PathInfo,
    ) -> Result<Option<BTreeMap<usize, Coin>>> {
        let mut resolved = BTreeMap::new();
        if incoming.tx.is_coinbase() {
            return Ok(Some(resolved));
        }

        let txid = incoming.txid();
        for (index, input) in incoming.tx.input.iter().enumerate() {
            let Some(hash) = input_address(input) else {
                continue;
            };
            if !info.has_path(&hash) {
                continue;
            }
            let prevout = input.previous_output;

            let mut coin = self.load_coin(&prevout)?;
            if coin.is_none() {
                if let Some(spender) = self.spender_of(&prevout)? {
                    if !self.replace_conflict(&prevout, spender, incoming)? {
                        tracing::debug!(%txid, %prevout, "rejected double spend");
                        return Ok(None);
                    }
                    // The loser's undo records resurrected the coin.
                    coin = self.load_coin(&prevout)?;
                }
            }

            let Some(coin) = coin else {
                continue;
            };
            if let Some(verifier) = &self.verifier {
                if !verifier.verify_input(&incoming.tx, index, &coin) {
                    tracing::debug!(%txid, index, "input failed script verification");
                    return Ok(None);
                }
            }
            resolved.insert(index, coin);
        }
        Ok(Some(resolved))
    }

    /// Arbitrate a double spend. Returns whether the incoming transaction
    /// takes the prevout; if so, the existing spender and its descendants
    /// have been removed.
    fn replace_conflict(
        &self,
        prevout: &OutPoint,
        spender: Spender,
        incoming: &TxRecord,
    ) -> Result<bool> {
        let existing = self.load_record(&spender.txid)?.ok_or_else(|| {
            Error::Missing(format!(
                "spend record for {prevout} names unknown transaction {}",
                spender.txid
            ))
        })?;

        match arbitrate(&existing, incoming) {
            Arbitration::KeepExisting => Ok(false),
            Arbitration::Replace => {
                tracing::warn!(
                    loser = %spender.txid,
                    winner = %incoming.txid(),
                    %prevout,
                    "evicting double-spent transaction"
                );
                let info = self.path_info(&existing.tx);
                self.remove_tree(&existing)?;
                self.sink.emit(Event::Conflict {
                    record: existing,
                    info,
                });
                Ok(true)
            }
        }
    }

    /// Write a verified transaction and all of its side records in one
    /// batch.
    fn insert(
        &self,
        record: TxRecord,
        info: &PathInfo,
        resolved: BTreeMap<usize, Coin>,
    ) -> Result<()> {
        let txid = record.txid();
        let mut losers: Vec<Txid> = Vec::new();

        self.in_session(|db| {
            db.put(db.layout.tx(&txid), record.encode());
            if record.is_confirmed() {
                db.put(db.layout.height(record.height as i64, &txid)?, Vec::new());
            } else {
                db.put(db.layout.pending(&txid), Vec::new());
            }
            db.put(db.layout.time(record.ps, &txid), Vec::new());
            for account in info.accounts() {
                db.put(db.layout.acct_tx(account, &txid), Vec::new());
                if record.is_confirmed() {
                    db.put(
                        db.layout.acct_height(account, record.height as i64, &txid)?,
                        Vec::new(),
                    );
                } else {
                    db.put(db.layout.acct_pending(account, &txid), Vec::new());
                }
                db.put(db.layout.acct_time(account, record.ps, &txid), Vec::new());
            }

            if !record.tx.is_coinbase() {
                for (index, input) in record.tx.input.iter().enumerate() {
                    let Some(hash) = input_address(input) else {
                        continue;
                    };
                    if !info.has_path(&hash) {
                        continue;
                    }
                    let prevout = input.previous_output;
                    match resolved.get(&index) {
                        Some(coin) => {
                            db.put(
                                db.layout.spent(&prevout.txid, prevout.vout),
                                Spender::new(txid, index as u32).encode().to_vec(),
                            );
                            db.put(db.layout.undo(&txid, index as u32), coin.encode());
                            db.del(db.layout.coin(&prevout.txid, prevout.vout));
                            if let Some(account) = coin_account(coin, &*db.book) {
                                db.del(db.layout.acct_coin(account, &prevout.txid, prevout.vout));
                            }
                            db.cache_op(CacheOp::Evict(prevout));
                        }
                        None => {
                            // Referenced output unknown: wait for it.
                            let key = db.layout.orphan(&prevout.txid, prevout.vout);
                            let mut list = match db.read(&key)? {
                                Some(bytes) => {
                                    OrphanList::decode(&bytes).map_err(|e| e.with_key(&key))?
                                }
                                None => OrphanList::default(),
                            };
                            list.push(Spender::new(txid, index as u32));
                            db.put(key, list.encode());
                        }
                    }
                }
            }

            for (vout, output) in record.tx.output.iter().enumerate() {
                if output.script_pubkey.is_op_return() {
                    continue;
                }
                let Some(hash) = output_address(&output.script_pubkey) else {
                    continue;
                };
                let Some(path) = info.get_path(&hash) else {
                    continue;
                };
                let vout = vout as u32;
                let coin = Coin::from_output(
                    output,
                    record.tx.version.0 as u32,
                    record.coin_height(),
                    record.tx.is_coinbase(),
                );
                if db.claim_orphans(&txid, vout, &coin, &mut losers)? {
                    // A waiting spender took the coin; no coin record.
                    continue;
                }
                let encoded = coin.encode();
                db.put(db.layout.coin(&txid, vout), encoded.clone());
                db.put(db.layout.acct_coin(path.account, &txid, vout), Vec::new());
                db.cache_op(CacheOp::Insert(OutPoint::new(txid, vout), encoded));
            }

            db.queue_event(Event::Tx {
                record: record.clone(),
                info: info.clone(),
            });
            if record.is_confirmed() {
                db.queue_event(Event::Confirmed {
                    record: record.clone(),
                    info: info.clone(),
                });
            }
            Ok(())
        })?;

        tracing::debug!(%txid, confirmed = record.is_confirmed(), "indexed wallet transaction");

        // Waiters that lost the orphan arbitration are double spends of the
        // claimed coin; evict them and their descendants.
        for loser in losers {
            let Some(loser_record) = self.load_record(&loser)? else {
                continue;
            };
            let info = self.path_info(&loser_record.tx);
            self.remove_tree(&loser_record)?;
            self.sink.emit(Event::Conflict {
                record: loser_record,
                info,
            });
        }
        Ok(())
    }

    /// Resolve the orphan list waiting on output `vout` of `txid`, if any.
    ///
    /// The first waiter that verifies claims the coin: its spend and undo
    /// records are staged in the current session. Every other waiter is
    /// collected into `losers`. Returns whether the coin was claimed.
    fn claim_orphans(
        &self,
        txid: &Txid,
        vout: u32,
        coin: &Coin,
        losers: &mut Vec<Txid>,
    ) -> Result<bool> {
        let key = self.layout.orphan(txid, vout);
        let Some(bytes) = self.read(&key)? else {
            return Ok(false);
        };
        let list = OrphanList::decode(&bytes).map_err(|e| e.with_key(&key))?;
        self.del(key);

        let mut claimed = false;
        for waiter in list.waiters {
            if claimed {
                losers.push(waiter.txid);
                continue;
            }
            let spender = self.load_record(&waiter.txid)?.ok_or_else(|| {
                Error::Missing(format!("orphan waiter {} not in index", waiter.txid))
            })?;
            let valid = match &self.verifier {
                Some(verifier) => verifier.verify_input(&spender.tx, waiter.vin as usize, coin),
                None => true,
            };
            if valid {
                self.put(self.layout.spent(txid, vout), waiter.encode().to_vec());
                self.put(self.layout.undo(&waiter.txid, waiter.vin), coin.encode());
                self.cache_op(CacheOp::Evict(OutPoint::new(*txid, vout)));
                claimed = true;
                tracing::debug!(
                    prevout = %OutPoint::new(*txid, vout),
                    spender = %waiter.txid,
                    "resolved orphan input"
                );
            } else {
                losers.push(waiter.txid);
            }
        }
        Ok(claimed)
    }

    // ── confirm ─────────────────────────────────────────────────────────

    /// Promote an already-indexed pending transaction to confirmed.
    /// Returns false when the transaction is unknown or already confirmed.
    pub fn confirm(&self, tx: &Transaction, block: BlockContext, info: &PathInfo) -> Result<bool> {
        let _guard = self.lock.acquire()?;
        let txid = tx.compute_txid();
        let Some(existing) = self.load_record(&txid)? else {
            return Ok(false);
        };
        if existing.is_confirmed() {
            return Ok(false);
        }
        self.confirm_record(existing, block, info)?;
        Ok(true)
    }

    /// Flip a pending record to confirmed: rewrite the record preserving
    /// `ps`, move the pending indices to height indices, and restamp the
    /// owned coins with the new height.
    fn confirm_record(&self, mut record: TxRecord, block: BlockContext, info: &PathInfo) -> Result<()> {
        let txid = record.txid();
        record.confirm(block);

        self.in_session(|db| {
            db.put(db.layout.tx(&txid), record.encode());
            db.del(db.layout.pending(&txid));
            db.put(db.layout.height(record.height as i64, &txid)?, Vec::new());
            for account in info.accounts() {
                db.del(db.layout.acct_pending(account, &txid));
                db.put(
                    db.layout.acct_height(account, record.height as i64, &txid)?,
                    Vec::new(),
                );
            }

            for vout in 0..record.tx.output.len() as u32 {
                let key = db.layout.coin(&txid, vout);
                if let Some(bytes) = db.read(&key)? {
                    let mut coin = Coin::decode(&bytes).map_err(|e| e.with_key(&key))?;
                    coin.height = record.coin_height();
                    let encoded = coin.encode();
                    db.put(key, encoded.clone());
                    db.cache_op(CacheOp::Insert(OutPoint::new(txid, vout), encoded));
                }
            }

            db.queue_event(Event::Tx {
                record: record.clone(),
                info: info.clone(),
            });
            db.queue_event(Event::Confirmed {
                record: record.clone(),
                info: info.clone(),
            });
            Ok(())
        })?;

        tracing::debug!(%txid, height = record.height, "confirmed wallet transaction");
        Ok(())
    }

    // ── unconfirm ───────────────────────────────────────────────────────

    /// Return a confirmed transaction to the pending state after a reorg.
    /// Unknown or already-pending transactions are a no-op returning
    /// `None`.
    pub fn unconfirm(&self, txid: &Txid) -> Result<Option<PathInfo>> {
        let _guard = self.lock.acquire()?;
        let Some(mut record) = self.load_record(txid)? else {
            return Ok(None);
        };
        if !record.is_confirmed() {
            return Ok(None);
        }
        let info = self.path_info(&record.tx);
        let prev_height = record.height as i64;
        record.unconfirm();
        let txid = *txid;

        self.in_session(|db| {
            db.put(db.layout.tx(&txid), record.encode());
            db.del(db.layout.height(prev_height, &txid)?);
            db.put(db.layout.pending(&txid), Vec::new());
            for account in info.accounts() {
                db.del(db.layout.acct_height(account, prev_height, &txid)?);
                db.put(db.layout.acct_pending(account, &txid), Vec::new());
            }

            for vout in 0..record.tx.output.len() as u32 {
                let key = db.layout.coin(&txid, vout);
                if let Some(bytes) = db.read(&key)? {
                    let mut coin = Coin::decode(&bytes).map_err(|e| e.with_key(&key))?;
                    coin.height = record.coin_height();
                    let encoded = coin.encode();
                    db.put(key, encoded.clone());
                    db.cache_op(CacheOp::Insert(OutPoint::new(txid, vout), encoded));
                }
            }

            db.queue_event(Event::Unconfirmed {
                record: record.clone(),
                info: info.clone(),
            });
            Ok(())
        })?;

        tracing::debug!(%txid, "unconfirmed wallet transaction");
        Ok(Some(info))
    }

    // ── remove ──────────────────────────────────────────────────────────

    /// Remove a transaction and every descendant that spends its outputs.
    /// Unknown hashes are a no-op returning `None`.
    pub fn remove(&self, txid: &Txid) -> Result<Option<PathInfo>> {
        let _guard = self.lock.acquire()?;
        let Some(record) = self.load_record(txid)? else {
            return Ok(None);
        };
        let info = self.path_info(&record.tx);
        self.remove_tree(&record)?;
        Ok(Some(info))
    }

    /// Depth-first removal: descendants first, then the transaction
    /// itself, one batch per transaction. Must run inside an existing
    /// critical section.
    fn remove_tree(&self, record: &TxRecord) -> Result<()> {
        let _reentry = self.lock.force();
        let txid = record.txid();
        for vout in 0..record.tx.output.len() as u32 {
            if let Some(spender) = self.spender_of(&OutPoint::new(txid, vout))? {
                let child = self.load_record(&spender.txid)?.ok_or_else(|| {
                    Error::Missing(format!(
                        "spend record for {txid}:{vout} names unknown transaction {}",
                        spender.txid
                    ))
                })?;
                self.remove_tree(&child)?;
            }
        }
        self.remove_single(record)
    }

    /// Remove one transaction: drop its records and indices, resurrect the
    /// coins it consumed from its undo records, and delete the coins it
    /// created.
    fn remove_single(&self, record: &TxRecord) -> Result<()> {
        let txid = record.txid();
        let info = self.path_info(&record.tx);

        self.in_session(|db| {
            db.del(db.layout.tx(&txid));
            if record.is_confirmed() {
                db.del(db.layout.height(record.height as i64, &txid)?);
            } else {
                db.del(db.layout.pending(&txid));
            }
            db.del(db.layout.time(record.ps, &txid));
            for account in info.accounts() {
                db.del(db.layout.acct_tx(account, &txid));
                if record.is_confirmed() {
                    db.del(db.layout.acct_height(account, record.height as i64, &txid)?);
                } else {
                    db.del(db.layout.acct_pending(account, &txid));
                }
                db.del(db.layout.acct_time(account, record.ps, &txid));
            }

            if !record.tx.is_coinbase() {
                for (index, input) in record.tx.input.iter().enumerate() {
                    let prevout = input.previous_output;
                    let undo_key = db.layout.undo(&txid, index as u32);
                    if let Some(bytes) = db.read(&undo_key)? {
                        let coin = Coin::decode(&bytes).map_err(|e| e.with_key(&undo_key))?;
                        db.put(db.layout.coin(&prevout.txid, prevout.vout), bytes.clone());
                        if let Some(account) = coin_account(&coin, &*db.book) {
                            db.put(
                                db.layout.acct_coin(account, &prevout.txid, prevout.vout),
                                Vec::new(),
                            );
                        }
                        db.del(db.layout.spent(&prevout.txid, prevout.vout));
                        db.del(db.layout.orphan(&prevout.txid, prevout.vout));
                        db.del(undo_key);
                        db.cache_op(CacheOp::Insert(prevout, bytes));
                    } else {
                        // Never resolved; withdraw the orphan registration.
                        let orphan_key = db.layout.orphan(&prevout.txid, prevout.vout);
                        if let Some(bytes) = db.read(&orphan_key)? {
                            let mut list =
                                OrphanList::decode(&bytes).map_err(|e| e.with_key(&orphan_key))?;
                            if list.remove(&Spender::new(txid, index as u32)) {
                                if list.is_empty() {
                                    db.del(orphan_key);
                                } else {
                                    db.put(orphan_key, list.encode());
                                }
                            }
                        }
                    }
                }
            }

            for (vout, output) in record.tx.output.iter().enumerate() {
                let vout = vout as u32;
                db.del(db.layout.coin(&txid, vout));
                if let Some(hash) = output_address(&output.script_pubkey) {
                    if let Some(path) = info.get_path(&hash) {
                        db.del(db.layout.acct_coin(path.account, &txid, vout));
                    }
                }
                db.cache_op(CacheOp::Evict(OutPoint::new(txid, vout)));
            }

            db.queue_event(Event::Removed {
                record: record.clone(),
                info: info.clone(),
            });
            Ok(())
        })?;

        tracing::debug!(%txid, "removed wallet transaction");
        Ok(())
    }

    // ── zap / abandon ───────────────────────────────────────────────────

    /// Remove unconfirmed transactions not seen within the last `age`
    /// seconds. Returns the removed hashes.
    pub fn zap(&self, account: Option<u32>, age: u64) -> Result<Vec<Txid>> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.zap_at(account, age, now)
    }

    /// [`TxDb::zap`] with an explicit clock reading.
    pub fn zap_at(&self, account: Option<u32>, age: u64, now: u64) -> Result<Vec<Txid>> {
        let _guard = self.lock.acquire()?;
        let cutoff = now.saturating_sub(age);
        let (gte, lte) = match account {
            Some(account) => self.layout.acct_time_range(account, 0, cutoff),
            None => self.layout.time_range(0, cutoff),
        };

        let entries = self.store.iterate(IterOptions::keys(gte, lte))?;
        let mut zapped = Vec::new();
        for (key, _) in entries {
            let txid = match account {
                Some(_) => self.layout.parse_acct_indexed(&key, "M")?.2,
                None => self.layout.parse_time(&key)?.1,
            };
            // Already removed as a descendant earlier in this sweep.
            let Some(record) = self.load_record(&txid)? else {
                continue;
            };
            if record.is_confirmed() {
                continue;
            }
            self.remove_tree(&record)?;
            zapped.push(txid);
        }

        if !zapped.is_empty() {
            tracing::info!(count = zapped.len(), "zapped stale unconfirmed transactions");
        }
        Ok(zapped)
    }

    /// Forcibly remove a still-pending transaction. Fails with
    /// [`Error::NotPending`] when the transaction is confirmed or unknown.
    pub fn abandon(&self, txid: &Txid) -> Result<PathInfo> {
        let _guard = self.lock.acquire()?;
        if !self.exists(&self.layout.pending(txid))? {
            return Err(Error::NotPending(*txid));
        }
        let record = self
            .load_record(txid)?
            .ok_or_else(|| Error::Missing(format!("pending flag without record for {txid}")))?;
        let info = self.path_info(&record.tx);
        self.remove_tree(&record)?;
        Ok(info)
    }
}
