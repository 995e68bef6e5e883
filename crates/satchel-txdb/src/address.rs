//! Address-hash extraction from scripts.
//!
//! The index never derives addresses; it only needs a stable hash per
//! script to ask the wallet's resolver "is this ours, and for which
//! account". Outputs are classified by direct inspection of the
//! script-pubkey bytes. Inputs are classified from the unlocking data,
//! which is inherently heuristic — a wrong guess merely fails the resolver
//! lookup and the input is treated as foreign.

use bitcoin::hashes::{hash160, sha256, Hash};
use bitcoin::{Script, TxIn, WitnessVersion};

/// Hash identifying an address, keyed by width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressHash {
    /// hash160: p2pkh, p2sh, p2wpkh.
    H160([u8; 20]),
    /// sha256 or x-only key: p2wsh, p2tr.
    H256([u8; 32]),
}

fn hash160(bytes: &[u8]) -> AddressHash {
    AddressHash::H160(hash160::Hash::hash(bytes).to_byte_array())
}

fn sha256(bytes: &[u8]) -> AddressHash {
    AddressHash::H256(sha256::Hash::hash(bytes).to_byte_array())
}

/// Address hash of an output's script-pubkey, or `None` for script shapes
/// the wallet cannot own.
pub fn output_address(script: &Script) -> Option<AddressHash> {
    let bytes = script.as_bytes();

    if script.is_p2pkh() {
        return Some(AddressHash::H160(bytes[3..23].try_into().expect("p2pkh")));
    }

    if script.is_p2sh() {
        return Some(AddressHash::H160(bytes[2..22].try_into().expect("p2sh")));
    }

    if let Some(version) = script.witness_version() {
        let program = &bytes[2..];
        match (version, program.len()) {
            (WitnessVersion::V0, 20) => {
                return Some(AddressHash::H160(program.try_into().expect("v0 keyhash")));
            }
            (WitnessVersion::V0, 32) => {
                return Some(AddressHash::H256(program.try_into().expect("v0 scripthash")));
            }
            (WitnessVersion::V1, 32) => {
                return Some(AddressHash::H256(program.try_into().expect("taproot")));
            }
            _ => return None,
        }
    }

    if let Some(pubkey) = script.p2pk_public_key() {
        return Some(hash160(&pubkey.to_bytes()));
    }

    None
}

/// Address hash of the party that signed an input, or `None` when the
/// unlocking data has no recognisable shape.
pub fn input_address(input: &TxIn) -> Option<AddressHash> {
    if !input.witness.is_empty() {
        // Nested segwit: the script-sig push is the p2sh redeem script.
        if !input.script_sig.is_empty() {
            let redeem = last_push(&input.script_sig)?;
            return Some(hash160(&redeem));
        }
        let last = input.witness.last()?;
        if input.witness.len() == 2 && is_pubkey_len(last.len()) {
            return Some(hash160(last));
        }
        // Witness script spend: the script is the final element.
        return Some(sha256(last));
    }

    let last = last_push(&input.script_sig)?;
    if is_pubkey_len(last.len()) {
        // sig ‖ pubkey unlocking a p2pkh output.
        return Some(hash160(&last));
    }
    // Otherwise assume a p2sh redeem script.
    Some(hash160(&last))
}

fn is_pubkey_len(len: usize) -> bool {
    len == 33 || len == 65
}

fn last_push(script: &Script) -> Option<Vec<u8>> {
    let mut last = None;
    for instruction in script.instructions() {
        match instruction.ok()? {
            bitcoin::script::Instruction::PushBytes(bytes) if !bytes.is_empty() => {
                last = Some(bytes.as_bytes().to_vec());
            }
            _ => {}
        }
    }
    last
}
