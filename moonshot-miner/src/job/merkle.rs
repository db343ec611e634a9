//! Merkle root computation for Stratum jobs.
//!
//! The pool sends the coinbase transaction split around the extranonce plus
//! the sibling hashes needed to climb from the coinbase leaf to the root. The
//! root changes with every extranonce2 value, so it is recomputed whenever the
//! counter moves.

use bitcoin::TxMerkleNode;
use bitcoin::hashes::{Hash, sha256d};

use crate::types::Extranonce2;

/// Double SHA-256 of `coinbase1 ‖ extranonce1 ‖ extranonce2 ‖ coinbase2`.
///
/// The coinbase bytes are hashed as-is; they are never parsed as a
/// transaction.
pub fn coinbase_hash(
    coinbase1: &[u8],
    extranonce1: &[u8],
    extranonce2: &Extranonce2,
    coinbase2: &[u8],
) -> TxMerkleNode {
    let mut coinbase = Vec::with_capacity(
        coinbase1.len() + extranonce1.len() + extranonce2.size() + coinbase2.len(),
    );
    coinbase.extend_from_slice(coinbase1);
    coinbase.extend_from_slice(extranonce1);
    extranonce2.extend_vec(&mut coinbase);
    coinbase.extend_from_slice(coinbase2);

    TxMerkleNode::from_raw_hash(sha256d::Hash::hash(&coinbase))
}

/// Fold branch hashes into the leaf: `h = sha256d(h ‖ branch)` for each
/// branch, in the order given.
pub fn fold_branches(leaf: TxMerkleNode, branches: &[TxMerkleNode]) -> TxMerkleNode {
    let mut current = leaf;
    let mut combined = [0u8; 64];
    for branch in branches {
        combined[..32].copy_from_slice(current.as_byte_array());
        combined[32..].copy_from_slice(branch.as_byte_array());
        current = TxMerkleNode::from_raw_hash(sha256d::Hash::hash(&combined));
    }
    current
}

/// Merkle root for one extranonce2 value.
pub fn merkle_root(
    coinbase1: &[u8],
    extranonce1: &[u8],
    extranonce2: &Extranonce2,
    coinbase2: &[u8],
    branches: &[TxMerkleNode],
) -> TxMerkleNode {
    let leaf = coinbase_hash(coinbase1, extranonce1, extranonce2, coinbase2);
    fold_branches(leaf, branches)
}
