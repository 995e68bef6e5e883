//! Orphan registry value codec.
//!
//! An orphan is a wallet-owned input whose referenced output is not yet
//! known to the index. The `o/<prev-hash>/<prev-vout>` value is a flat
//! concatenation of 36-byte waiter outpoints, appended in arrival order and
//! consulted when the referenced output finally appears.
//!
//! The same 36-byte form (txid ‖ u32 LE index) is the value of spend
//! records under `s/`.

use crate::error::{Error, Result};
use bitcoin::hashes::Hash;
use bitcoin::Txid;

const ENTRY_LEN: usize = 36;

/// One transaction input waiting on (or spending) a prevout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spender {
    /// Hash of the spending transaction.
    pub txid: Txid,
    /// Index of the input within the spender.
    pub vin: u32,
}

impl Spender {
    pub fn new(txid: Txid, vin: u32) -> Self {
        Self { txid, vin }
    }

    /// Serialize as txid (32 bytes, raw) ‖ vin (4 bytes, little-endian).
    pub fn encode(&self) -> [u8; ENTRY_LEN] {
        let mut out = [0u8; ENTRY_LEN];
        out[..32].copy_from_slice(self.txid.as_ref());
        out[32..].copy_from_slice(&self.vin.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ENTRY_LEN {
            return Err(Error::Corrupt {
                key: String::new(),
                reason: format!("spender record of {} bytes", bytes.len()),
            });
        }
        let mut txid = [0u8; 32];
        txid.copy_from_slice(&bytes[..32]);
        let vin = u32::from_le_bytes(bytes[32..].try_into().expect("sliced above"));
        Ok(Self {
            txid: Txid::from_byte_array(txid),
            vin,
        })
    }
}

/// The waiters registered against one prevout, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanList {
    pub waiters: Vec<Spender>,
}

impl OrphanList {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % ENTRY_LEN != 0 {
            return Err(Error::Corrupt {
                key: String::new(),
                reason: format!("orphan list of {} bytes", bytes.len()),
            });
        }
        let waiters = bytes
            .chunks_exact(ENTRY_LEN)
            .map(Spender::decode)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { waiters })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.waiters.len() * ENTRY_LEN);
        for waiter in &self.waiters {
            out.extend_from_slice(&waiter.encode());
        }
        out
    }

    pub fn push(&mut self, waiter: Spender) {
        self.waiters.push(waiter);
    }

    /// Remove a waiter. Returns whether it was present.
    pub fn remove(&mut self, waiter: &Spender) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|w| w != waiter);
        before != self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txid(byte: u8) -> Txid {
        Txid::from_byte_array([byte; 32])
    }

    #[test]
    fn test_spender_round_trip() {
        let spender = Spender::new(txid(7), 3);
        assert_eq!(Spender::decode(&spender.encode()).unwrap(), spender);
    }

    #[test]
    fn test_list_preserves_order() {
        let mut list = OrphanList::default();
        list.push(Spender::new(txid(1), 0));
        list.push(Spender::new(txid(2), 5));
        list.push(Spender::new(txid(3), 1));

        let decoded = OrphanList::decode(&list.encode()).unwrap();
        assert_eq!(decoded, list);
        assert_eq!(decoded.waiters[1].txid, txid(2));
    }

    #[test]
    fn test_remove_waiter() {
        let mut list = OrphanList::default();
        list.push(Spender::new(txid(1), 0));
        list.push(Spender::new(txid(2), 0));

        assert!(list.remove(&Spender::new(txid(1), 0)));
        assert!(!list.remove(&Spender::new(txid(1), 0)));
        assert_eq!(list.waiters.len(), 1);
    }

    #[test]
    fn test_ragged_bytes_are_corrupt() {
        assert!(OrphanList::decode(&[0u8; 37]).is_err());
        assert!(Spender::decode(&[0u8; 35]).is_err());
    }
}
