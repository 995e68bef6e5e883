//! Wallet path resolution.
//!
//! The index does not know which addresses the wallet owns; it asks the
//! [`AddressBook`] capability, provided by the outer wallet database. A
//! [`PathInfo`] is the resolved view for one transaction: which accounts it
//! touches and which of its address hashes map to which path.

use crate::address::{input_address, output_address, AddressHash};
use crate::coin::Coin;
use bitcoin::Transaction;
use std::collections::{BTreeSet, HashMap};

/// Where an address lives inside the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Path {
    /// Owning account id.
    pub account: u32,
}

/// Resolver from address hash to wallet path. External collaborator; the
/// index only ever calls [`AddressBook::lookup`].
pub trait AddressBook: Send + Sync {
    fn lookup(&self, hash: &AddressHash) -> Option<Path>;
}

/// Per-transaction address-to-path mapping.
#[derive(Debug, Clone, Default)]
pub struct PathInfo {
    accounts: BTreeSet<u32>,
    paths: HashMap<AddressHash, Path>,
}

impl PathInfo {
    /// Resolve every input and output address of `tx` against the wallet.
    pub fn from_tx(tx: &Transaction, book: &dyn AddressBook) -> Self {
        let mut info = Self::default();

        for input in &tx.input {
            if let Some(hash) = input_address(input) {
                info.insert(hash, book);
            }
        }
        for output in &tx.output {
            if let Some(hash) = output_address(&output.script_pubkey) {
                info.insert(hash, book);
            }
        }

        info
    }

    fn insert(&mut self, hash: AddressHash, book: &dyn AddressBook) {
        if self.paths.contains_key(&hash) {
            return;
        }
        if let Some(path) = book.lookup(&hash) {
            self.accounts.insert(path.account);
            self.paths.insert(hash, path);
        }
    }

    pub fn get_path(&self, hash: &AddressHash) -> Option<&Path> {
        self.paths.get(hash)
    }

    pub fn has_path(&self, hash: &AddressHash) -> bool {
        self.paths.contains_key(hash)
    }

    /// Accounts touched by the transaction, ascending.
    pub fn accounts(&self) -> impl Iterator<Item = u32> + '_ {
        self.accounts.iter().copied()
    }

    /// True when no address of the transaction belongs to the wallet.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Account that owns a coin, resolved through its script-pubkey.
pub(crate) fn coin_account(coin: &Coin, book: &dyn AddressBook) -> Option<u32> {
    let hash = output_address(&coin.script)?;
    book.lookup(&hash).map(|path| path.account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::hashes::Hash;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, ScriptBuf, TxOut};

    struct OneAddress {
        hash: AddressHash,
        account: u32,
    }

    impl AddressBook for OneAddress {
        fn lookup(&self, hash: &AddressHash) -> Option<Path> {
            (*hash == self.hash).then_some(Path {
                account: self.account,
            })
        }
    }

    #[test]
    fn test_from_tx_resolves_owned_outputs() {
        let hash = [5u8; 20];
        let book = OneAddress {
            hash: AddressHash::H160(hash),
            account: 2,
        };
        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![],
            output: vec![
                TxOut {
                    value: Amount::from_sat(1),
                    script_pubkey: ScriptBuf::new_p2pkh(
                        &bitcoin::PubkeyHash::from_byte_array(hash),
                    ),
                },
                TxOut {
                    value: Amount::from_sat(2),
                    script_pubkey: ScriptBuf::new_p2pkh(
                        &bitcoin::PubkeyHash::from_byte_array([6u8; 20]),
                    ),
                },
            ],
        };

        let info = PathInfo::from_tx(&tx, &book);
        assert!(!info.is_empty());
        assert_eq!(info.accounts().collect::<Vec<_>>(), vec![2]);
        assert!(info.has_path(&AddressHash::H160(hash)));
        assert!(!info.has_path(&AddressHash::H160([6u8; 20])));
        assert_eq!(info.get_path(&AddressHash::H160(hash)).unwrap().account, 2);
    }
}
