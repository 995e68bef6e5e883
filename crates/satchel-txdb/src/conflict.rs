//! Double-spend arbitration.
//!
//! When an incoming transaction spends a prevout that an already-indexed
//! transaction spends, exactly one of them survives. Confirmation beats
//! pending. Between two confirmed spenders the earlier block time wins;
//! between two pending spenders the later arrival wins (replacement), with
//! ties keeping the incumbent.

use crate::record::TxRecord;

/// Outcome of arbitration between the indexed spender and an incoming
/// double-spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arbitration {
    /// The indexed spender survives; the incoming transaction is rejected.
    KeepExisting,
    /// The indexed spender (and its descendants) are removed; the incoming
    /// transaction takes the prevout.
    Replace,
}

/// Decide which of two conflicting spenders survives.
pub fn arbitrate(existing: &TxRecord, incoming: &TxRecord) -> Arbitration {
    match (existing.is_confirmed(), incoming.is_confirmed()) {
        // A confirmed spender is never displaced by a pending one.
        (true, false) => Arbitration::KeepExisting,
        // Both confirmed: the earlier block time wins.
        (true, true) if incoming.ts >= existing.ts => Arbitration::KeepExisting,
        (true, true) => Arbitration::Replace,
        // A confirmed arrival displaces a pending spender.
        (false, true) => Arbitration::Replace,
        // Both pending: a strictly newer arrival replaces the incumbent.
        (false, false) if incoming.ps > existing.ps => Arbitration::Replace,
        (false, false) => Arbitration::KeepExisting,
    }
}
