//! # Wallet transaction index
//!
//! A per-wallet persistent store tracking every transaction touching the
//! wallet, the coins it owns, and the links between them:
//!
//! 1. Insertion, confirmation and unconfirmation of transactions, following
//!    the chain through reorgs.
//! 2. Double-spend arbitration with recursive eviction of the losing
//!    spender and its descendants.
//! 3. Orphan resolution: inputs referencing not-yet-known outputs are
//!    parked and attached when the output arrives.
//! 4. Range queries by block height, first-seen time and account, plus
//!    balance straight off the coin records.
//!
//! The index runs on any ordered key-value store implementing
//! [`satchel_kv::KeyValue`]. All mutations of one wallet are serialized
//! through a FIFO lock and applied as atomic batches; events fire after
//! commit, in commit order.

mod address;
mod batch;
mod cache;
mod coin;
mod conflict;
mod error;
mod events;
mod layout;
mod lock;
mod orphan;
mod path;
mod query;
mod record;
mod txdb;

pub use address::{input_address, output_address, AddressHash};
pub use coin::{Coin, UNCONFIRMED_HEIGHT};
pub use error::{Error, Result};
pub use events::{Event, EventSink, NullSink};
pub use orphan::Spender;
pub use path::{AddressBook, Path, PathInfo};
pub use query::{Balance, RangeQuery};
pub use record::{BlockContext, TxContext, TxRecord};
pub use txdb::{AddOutcome, InputVerifier, TxDb, TxDbOptions};
