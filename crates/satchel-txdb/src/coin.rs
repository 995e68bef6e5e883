//! Fixed-layout coin record.
//!
//! A coin is one unspent transaction output owned by the wallet. Its storage
//! form is position-fixed so readers can pull the height and value straight
//! out of the bytes without a full decode:
//!
//! ```text
//! [0..4)   version/flags, u32 LE; bit 31 marks a coinbase output
//! [4..8)   height, u32 LE; 0x7FFFFFFF while unconfirmed
//! [8..16)  value in base units, u64 LE
//! [16..)   raw script-pubkey bytes
//! ```

use crate::error::{Error, Result};
use bitcoin::{ScriptBuf, TxOut};

/// Height stored for a coin whose transaction is not yet in a block.
pub const UNCONFIRMED_HEIGHT: u32 = 0x7FFF_FFFF;

const COINBASE_FLAG: u32 = 1 << 31;

/// One unspent output owned by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    /// Version of the transaction that created this output.
    pub version: u32,
    /// Block height, or [`UNCONFIRMED_HEIGHT`].
    pub height: u32,
    /// Value in base units.
    pub value: u64,
    /// Script pubkey of the output.
    pub script: ScriptBuf,
    /// Whether the creating transaction was a coinbase.
    pub coinbase: bool,
}

impl Coin {
    /// Build a coin from a transaction output.
    pub fn from_output(output: &TxOut, version: u32, height: u32, coinbase: bool) -> Self {
        Self {
            version,
            height,
            value: output.value.to_sat(),
            script: output.script_pubkey.clone(),
            coinbase,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.height != UNCONFIRMED_HEIGHT
    }

    /// Serialize to the fixed storage layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.script.len());
        let version = if self.coinbase {
            self.version | COINBASE_FLAG
        } else {
            self.version & !COINBASE_FLAG
        };
        out.extend_from_slice(&version.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.value.to_le_bytes());
        out.extend_from_slice(self.script.as_bytes());
        out
    }

    /// Deserialize from the fixed storage layout.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 16 {
            return Err(Error::Corrupt {
                key: String::new(),
                reason: format!("coin record too short: {} bytes", bytes.len()),
            });
        }
        let version = u32::from_le_bytes(bytes[0..4].try_into().expect("sliced above"));
        let height = u32::from_le_bytes(bytes[4..8].try_into().expect("sliced above"));
        let value = u64::from_le_bytes(bytes[8..16].try_into().expect("sliced above"));
        Ok(Self {
            version: version & !COINBASE_FLAG,
            height,
            value,
            script: ScriptBuf::from_bytes(bytes[16..].to_vec()),
            coinbase: version & COINBASE_FLAG != 0,
        })
    }

    /// Read only the height field of an encoded coin.
    pub fn decode_height(bytes: &[u8]) -> Result<u32> {
        let raw = bytes.get(4..8).ok_or_else(|| Error::Corrupt {
            key: String::new(),
            reason: "coin record too short for height".into(),
        })?;
        Ok(u32::from_le_bytes(raw.try_into().expect("sliced above")))
    }

    /// Read only the value field of an encoded coin.
    pub fn decode_value(bytes: &[u8]) -> Result<u64> {
        let raw = bytes.get(8..16).ok_or_else(|| Error::Corrupt {
            key: String::new(),
            reason: "coin record too short for value".into(),
        })?;
        Ok(u64::from_le_bytes(raw.try_into().expect("sliced above")))
    }
}
