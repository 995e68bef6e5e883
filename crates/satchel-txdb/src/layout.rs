//! Key codec for the wallet keyspace.
//!
//! Every record lives in one flat ordered namespace. Keys are ASCII: a
//! one-character role prefix, then slash-delimited components. Heights,
//! timestamps, account ids and output indices are zero-padded to ten decimal
//! digits so lexicographic order matches numeric order. Range upper bounds
//! are terminated with `~`, one codepoint above `/`.
//!
//! The whole keyspace of one wallet sits under `w/<wid>/`, so many wallet
//! indexes can share a single physical store. The wallet scope is carried by
//! the [`Layout`] value itself rather than by global state.

use crate::error::{Error, Result};
use bitcoin::Txid;

/// Fixed decimal width for numeric key components.
const WIDTH: usize = 10;

/// Largest value that fits the fixed width; range bounds clamp to it.
const MAX_FIELD: u64 = 9_999_999_999;

/// Terminates a range upper bound; sorts after any key component.
const SENTINEL: char = '~';

/// Builds and parses the structured keys of one wallet's index.
#[derive(Debug, Clone)]
pub struct Layout {
    prefix: String,
}

impl Layout {
    pub fn new(wallet_id: u32) -> Self {
        Self {
            prefix: format!("w/{wallet_id:0WIDTH$}/"),
        }
    }

    fn checked_height(height: i64) -> Result<u64> {
        u64::try_from(height).map_err(|_| Error::NegativeHeight(height))
    }

    // ── Global records ──────────────────────────────────────────────────

    /// `t/<hash>` — extended transaction record.
    pub fn tx(&self, txid: &Txid) -> Vec<u8> {
        format!("{}t/{txid}", self.prefix).into_bytes()
    }

    /// `p/<hash>` — pending flag, present iff unconfirmed.
    pub fn pending(&self, txid: &Txid) -> Vec<u8> {
        format!("{}p/{txid}", self.prefix).into_bytes()
    }

    /// `h/<height>/<hash>` — height index, present iff confirmed.
    pub fn height(&self, height: i64, txid: &Txid) -> Result<Vec<u8>> {
        let height = Self::checked_height(height)?;
        Ok(format!("{}h/{height:0WIDTH$}/{txid}", self.prefix).into_bytes())
    }

    /// `m/<ps>/<hash>` — time index, always present.
    pub fn time(&self, ps: u64, txid: &Txid) -> Vec<u8> {
        format!("{}m/{ps:0WIDTH$}/{txid}", self.prefix).into_bytes()
    }

    /// `c/<hash>/<vout>` — coin record, owned and unspent.
    pub fn coin(&self, txid: &Txid, vout: u32) -> Vec<u8> {
        format!("{}c/{txid}/{vout:0WIDTH$}", self.prefix).into_bytes()
    }

    /// `s/<hash>/<vout>` — spend record for a prevout.
    pub fn spent(&self, txid: &Txid, vout: u32) -> Vec<u8> {
        format!("{}s/{txid}/{vout:0WIDTH$}", self.prefix).into_bytes()
    }

    /// `d/<hash>/<index>` — undo record for input `index` of a spender.
    pub fn undo(&self, txid: &Txid, index: u32) -> Vec<u8> {
        format!("{}d/{txid}/{index:0WIDTH$}", self.prefix).into_bytes()
    }

    /// `o/<hash>/<vout>` — orphan list awaiting the referenced output.
    pub fn orphan(&self, txid: &Txid, vout: u32) -> Vec<u8> {
        format!("{}o/{txid}/{vout:0WIDTH$}", self.prefix).into_bytes()
    }

    // ── Per-account mirrors ─────────────────────────────────────────────

    /// `T/<acct>/<hash>`
    pub fn acct_tx(&self, account: u32, txid: &Txid) -> Vec<u8> {
        format!("{}T/{account:0WIDTH$}/{txid}", self.prefix).into_bytes()
    }

    /// `P/<acct>/<hash>`
    pub fn acct_pending(&self, account: u32, txid: &Txid) -> Vec<u8> {
        format!("{}P/{account:0WIDTH$}/{txid}", self.prefix).into_bytes()
    }

    /// `H/<acct>/<height>/<hash>`
    pub fn acct_height(&self, account: u32, height: i64, txid: &Txid) -> Result<Vec<u8>> {
        let height = Self::checked_height(height)?;
        Ok(
            format!("{}H/{account:0WIDTH$}/{height:0WIDTH$}/{txid}", self.prefix)
                .into_bytes(),
        )
    }

    /// `M/<acct>/<ps>/<hash>`
    pub fn acct_time(&self, account: u32, ps: u64, txid: &Txid) -> Vec<u8> {
        format!("{}M/{account:0WIDTH$}/{ps:0WIDTH$}/{txid}", self.prefix).into_bytes()
    }

    /// `C/<acct>/<hash>/<vout>`
    pub fn acct_coin(&self, account: u32, txid: &Txid, vout: u32) -> Vec<u8> {
        format!("{}C/{account:0WIDTH$}/{txid}/{vout:0WIDTH$}", self.prefix).into_bytes()
    }

    // ── Range bounds ────────────────────────────────────────────────────

    fn prefix_range(&self, role: &str) -> (Vec<u8>, Vec<u8>) {
        let gte = format!("{}{role}/", self.prefix);
        let lte = format!("{gte}{SENTINEL}");
        (gte.into_bytes(), lte.into_bytes())
    }

    /// Every pending flag.
    pub fn pending_range(&self) -> (Vec<u8>, Vec<u8>) {
        self.prefix_range("p")
    }

    /// Every coin record.
    pub fn coin_range(&self) -> (Vec<u8>, Vec<u8>) {
        self.prefix_range("c")
    }

    /// Height index entries for heights in `[start, end]`.
    pub fn height_range(&self, start: u64, end: u64) -> (Vec<u8>, Vec<u8>) {
        let (start, end) = (start.min(MAX_FIELD), end.min(MAX_FIELD));
        let gte = format!("{}h/{start:0WIDTH$}/", self.prefix);
        let lte = format!("{}h/{end:0WIDTH$}/{SENTINEL}", self.prefix);
        (gte.into_bytes(), lte.into_bytes())
    }

    /// Time index entries for `ps` in `[start, end]`.
    pub fn time_range(&self, start: u64, end: u64) -> (Vec<u8>, Vec<u8>) {
        let (start, end) = (start.min(MAX_FIELD), end.min(MAX_FIELD));
        let gte = format!("{}m/{start:0WIDTH$}/", self.prefix);
        let lte = format!("{}m/{end:0WIDTH$}/{SENTINEL}", self.prefix);
        (gte.into_bytes(), lte.into_bytes())
    }

    /// Pending mirrors for one account.
    pub fn acct_pending_range(&self, account: u32) -> (Vec<u8>, Vec<u8>) {
        let gte = format!("{}P/{account:0WIDTH$}/", self.prefix);
        let lte = format!("{gte}{SENTINEL}");
        (gte.into_bytes(), lte.into_bytes())
    }

    /// Coin mirrors for one account.
    pub fn acct_coin_range(&self, account: u32) -> (Vec<u8>, Vec<u8>) {
        let gte = format!("{}C/{account:0WIDTH$}/", self.prefix);
        let lte = format!("{gte}{SENTINEL}");
        (gte.into_bytes(), lte.into_bytes())
    }

    /// Height mirrors for one account, heights in `[start, end]`.
    pub fn acct_height_range(&self, account: u32, start: u64, end: u64) -> (Vec<u8>, Vec<u8>) {
        let (start, end) = (start.min(MAX_FIELD), end.min(MAX_FIELD));
        let gte = format!("{}H/{account:0WIDTH$}/{start:0WIDTH$}/", self.prefix);
        let lte = format!("{}H/{account:0WIDTH$}/{end:0WIDTH$}/{SENTINEL}", self.prefix);
        (gte.into_bytes(), lte.into_bytes())
    }

    /// Time mirrors for one account, `ps` in `[start, end]`.
    pub fn acct_time_range(&self, account: u32, start: u64, end: u64) -> (Vec<u8>, Vec<u8>) {
        let (start, end) = (start.min(MAX_FIELD), end.min(MAX_FIELD));
        let gte = format!("{}M/{account:0WIDTH$}/{start:0WIDTH$}/", self.prefix);
        let lte = format!("{}M/{account:0WIDTH$}/{end:0WIDTH$}/{SENTINEL}", self.prefix);
        (gte.into_bytes(), lte.into_bytes())
    }

    // ── Parsers ─────────────────────────────────────────────────────────

    fn components<'a>(&self, key: &'a [u8], role: &str, n: usize) -> Result<Vec<&'a str>> {
        let text = std::str::from_utf8(key).map_err(|e| Error::corrupt(key, e))?;
        let rest = text
            .strip_prefix(&self.prefix)
            .and_then(|t| t.strip_prefix(role))
            .and_then(|t| t.strip_prefix('/'))
            .ok_or_else(|| Error::corrupt(key, format!("expected role {role:?}")))?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != n {
            return Err(Error::corrupt(
                key,
                format!("expected {n} components, got {}", parts.len()),
            ));
        }
        Ok(parts)
    }

    fn parse_txid(key: &[u8], part: &str) -> Result<Txid> {
        part.parse().map_err(|e| Error::corrupt(key, e))
    }

    fn parse_num(key: &[u8], part: &str) -> Result<u64> {
        part.parse().map_err(|e| Error::corrupt(key, e))
    }

    /// Parse `p/<hash>` (or `t/<hash>`-shaped keys via `role`).
    pub fn parse_hash(&self, key: &[u8], role: &str) -> Result<Txid> {
        let parts = self.components(key, role, 1)?;
        Self::parse_txid(key, parts[0])
    }

    /// Parse `h/<height>/<hash>`.
    pub fn parse_height(&self, key: &[u8]) -> Result<(u64, Txid)> {
        let parts = self.components(key, "h", 2)?;
        Ok((
            Self::parse_num(key, parts[0])?,
            Self::parse_txid(key, parts[1])?,
        ))
    }

    /// Parse `m/<ps>/<hash>`.
    pub fn parse_time(&self, key: &[u8]) -> Result<(u64, Txid)> {
        let parts = self.components(key, "m", 2)?;
        Ok((
            Self::parse_num(key, parts[0])?,
            Self::parse_txid(key, parts[1])?,
        ))
    }

    /// Parse `c/<hash>/<vout>`-shaped keys (`c`, `s`, `d`, `o` via `role`).
    pub fn parse_outpoint(&self, key: &[u8], role: &str) -> Result<(Txid, u32)> {
        let parts = self.components(key, role, 2)?;
        Ok((
            Self::parse_txid(key, parts[0])?,
            Self::parse_num(key, parts[1])? as u32,
        ))
    }

    /// Parse `P/<acct>/<hash>` (or `T/…` via `role`).
    pub fn parse_acct_hash(&self, key: &[u8], role: &str) -> Result<(u32, Txid)> {
        let parts = self.components(key, role, 2)?;
        Ok((
            Self::parse_num(key, parts[0])? as u32,
            Self::parse_txid(key, parts[1])?,
        ))
    }

    /// Parse `H/<acct>/<height>/<hash>` or `M/<acct>/<ps>/<hash>`.
    pub fn parse_acct_indexed(&self, key: &[u8], role: &str) -> Result<(u32, u64, Txid)> {
        let parts = self.components(key, role, 3)?;
        Ok((
            Self::parse_num(key, parts[0])? as u32,
            Self::parse_num(key, parts[1])?,
            Self::parse_txid(key, parts[2])?,
        ))
    }

    /// Parse `C/<acct>/<hash>/<vout>`.
    pub fn parse_acct_coin(&self, key: &[u8]) -> Result<(u32, Txid, u32)> {
        let parts = self.components(key, "C", 3)?;
        Ok((
            Self::parse_num(key, parts[0])? as u32,
            Self::parse_txid(key, parts[1])?,
            Self::parse_num(key, parts[2])? as u32,
        ))
    }
}
