//! Query surface.
//!
//! All queries are prefix iterations and point reads over the committed
//! keyspace; none of them takes the serialization lock. Balance is computed
//! straight from the fixed offsets of the coin records.

use crate::coin::{Coin, UNCONFIRMED_HEIGHT};
use crate::error::{Error, Result};
use crate::orphan::Spender;
use crate::record::TxRecord;
use crate::txdb::TxDb;
use bitcoin::{OutPoint, Txid};
use satchel_kv::IterOptions;

/// Bounds for a range query over the height or time index.
#[derive(Debug, Clone, Copy)]
pub struct RangeQuery {
    /// Inclusive lower bound (height or `ps`).
    pub start: u64,
    /// Inclusive upper bound.
    pub end: u64,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
    /// Return newest-first.
    pub reverse: bool,
}

impl Default for RangeQuery {
    fn default() -> Self {
        Self {
            start: 0,
            end: u64::MAX,
            limit: None,
            reverse: false,
        }
    }
}

/// Wallet balance in base units, partitioned by confirmation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
    pub confirmed: u64,
    pub unconfirmed: u64,
}

impl Balance {
    pub fn total(&self) -> u64 {
        self.confirmed + self.unconfirmed
    }
}

impl TxDb {
    /// Committed transaction record, if present.
    pub fn get_tx(&self, txid: &Txid) -> Result<Option<TxRecord>> {
        let key = self.layout.tx(txid);
        match self.store.get(&key)? {
            Some(bytes) => TxRecord::decode(&bytes)
                .map(Some)
                .map_err(|e| e.with_key(&key)),
            None => Ok(None),
        }
    }

    pub fn has_tx(&self, txid: &Txid) -> Result<bool> {
        Ok(self.store.has(&self.layout.tx(txid))?)
    }

    /// Whether the transaction is indexed and unconfirmed.
    pub fn is_pending(&self, txid: &Txid) -> Result<bool> {
        Ok(self.store.has(&self.layout.pending(txid))?)
    }

    /// Committed coin record, if present. Fills the coin cache on miss.
    pub fn get_coin(&self, outpoint: &OutPoint) -> Result<Option<Coin>> {
        if let Some(bytes) = self.cache.lock().get(outpoint) {
            return Coin::decode(&bytes).map(Some);
        }
        let key = self.layout.coin(&outpoint.txid, outpoint.vout);
        match self.store.get(&key)? {
            Some(bytes) => {
                self.cache.lock().insert(*outpoint, bytes.clone());
                Coin::decode(&bytes).map(Some).map_err(|e| e.with_key(&key))
            }
            None => Ok(None),
        }
    }

    pub fn has_coin(&self, outpoint: &OutPoint) -> Result<bool> {
        Ok(self
            .store
            .has(&self.layout.coin(&outpoint.txid, outpoint.vout))?)
    }

    /// The input currently spending a prevout, if any.
    pub fn get_spender(&self, outpoint: &OutPoint) -> Result<Option<Spender>> {
        let key = self.layout.spent(&outpoint.txid, outpoint.vout);
        match self.store.get(&key)? {
            Some(bytes) => Spender::decode(&bytes)
                .map(Some)
                .map_err(|e| e.with_key(&key)),
            None => Ok(None),
        }
    }

    /// Sum every owned unspent coin, partitioned by the unconfirmed
    /// sentinel height.
    pub fn balance(&self, account: Option<u32>) -> Result<Balance> {
        let mut balance = Balance::default();

        let mut tally = |key: &[u8], bytes: &[u8]| -> Result<()> {
            let height = Coin::decode_height(bytes).map_err(|e| e.with_key(key))?;
            let value = Coin::decode_value(bytes).map_err(|e| e.with_key(key))?;
            if height == UNCONFIRMED_HEIGHT {
                balance.unconfirmed += value;
            } else {
                balance.confirmed += value;
            }
            Ok(())
        };

        match account {
            None => {
                let (gte, lte) = self.layout.coin_range();
                for (key, value) in self.store.iterate(IterOptions::range(gte, lte))? {
                    tally(&key, &value)?;
                }
            }
            Some(account) => {
                let (gte, lte) = self.layout.acct_coin_range(account);
                for (key, _) in self.store.iterate(IterOptions::keys(gte, lte))? {
                    let (_, txid, vout) = self.layout.parse_acct_coin(&key)?;
                    let coin_key = self.layout.coin(&txid, vout);
                    let bytes = self.store.get(&coin_key)?.ok_or_else(|| {
                        Error::Missing(format!("coin mirror without coin for {txid}:{vout}"))
                    })?;
                    tally(&coin_key, &bytes)?;
                }
            }
        }

        Ok(balance)
    }

    /// Transactions ordered by first-seen time (`ps`).
    pub fn history(&self, account: Option<u32>, query: RangeQuery) -> Result<Vec<TxRecord>> {
        let (gte, lte) = match account {
            Some(account) => self.layout.acct_time_range(account, query.start, query.end),
            None => self.layout.time_range(query.start, query.end),
        };
        let opts = IterOptions::keys(gte, lte)
            .with_limit(query.limit)
            .reversed(query.reverse);

        let mut records = Vec::new();
        for (key, _) in self.store.iterate(opts)? {
            let txid = match account {
                Some(_) => self.layout.parse_acct_indexed(&key, "M")?.2,
                None => self.layout.parse_time(&key)?.1,
            };
            records.push(self.expect_tx(&txid, "time index")?);
        }
        Ok(records)
    }

    /// Confirmed transactions ordered by block height.
    pub fn range_by_height(&self, account: Option<u32>, query: RangeQuery) -> Result<Vec<TxRecord>> {
        let (gte, lte) = match account {
            Some(account) => self.layout.acct_height_range(account, query.start, query.end),
            None => self.layout.height_range(query.start, query.end),
        };
        let opts = IterOptions::keys(gte, lte)
            .with_limit(query.limit)
            .reversed(query.reverse);

        let mut records = Vec::new();
        for (key, _) in self.store.iterate(opts)? {
            let txid = match account {
                Some(_) => self.layout.parse_acct_indexed(&key, "H")?.2,
                None => self.layout.parse_height(&key)?.1,
            };
            records.push(self.expect_tx(&txid, "height index")?);
        }
        Ok(records)
    }

    /// Every unconfirmed transaction.
    pub fn unconfirmed(&self, account: Option<u32>) -> Result<Vec<TxRecord>> {
        let (gte, lte) = match account {
            Some(account) => self.layout.acct_pending_range(account),
            None => self.layout.pending_range(),
        };

        let mut records = Vec::new();
        for (key, _) in self.store.iterate(IterOptions::keys(gte, lte))? {
            let txid = match account {
                Some(_) => self.layout.parse_acct_hash(&key, "P")?.1,
                None => self.layout.parse_hash(&key, "p")?,
            };
            records.push(self.expect_tx(&txid, "pending flag")?);
        }
        Ok(records)
    }

    /// Every owned unspent coin.
    pub fn coins(&self, account: Option<u32>) -> Result<Vec<(OutPoint, Coin)>> {
        let mut coins = Vec::new();

        match account {
            None => {
                let (gte, lte) = self.layout.coin_range();
                for (key, value) in self.store.iterate(IterOptions::range(gte, lte))? {
                    let (txid, vout) = self.layout.parse_outpoint(&key, "c")?;
                    let coin = Coin::decode(&value).map_err(|e| e.with_key(&key))?;
                    coins.push((OutPoint::new(txid, vout), coin));
                }
            }
            Some(account) => {
                let (gte, lte) = self.layout.acct_coin_range(account);
                for (key, _) in self.store.iterate(IterOptions::keys(gte, lte))? {
                    let (_, txid, vout) = self.layout.parse_acct_coin(&key)?;
                    let outpoint = OutPoint::new(txid, vout);
                    let coin = self.get_coin(&outpoint)?.ok_or_else(|| {
                        Error::Missing(format!("coin mirror without coin for {outpoint}"))
                    })?;
                    coins.push((outpoint, coin));
                }
            }
        }

        Ok(coins)
    }

    fn expect_tx(&self, txid: &Txid, index: &str) -> Result<TxRecord> {
        self.get_tx(txid)?
            .ok_or_else(|| Error::Missing(format!("{index} entry without record for {txid}")))
    }
}
