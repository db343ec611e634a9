//! Bounded nonce search over a prepared header.
//!
//! One batch hashes up to `batch_size` consecutive nonces (wrapping at
//! `u32::MAX`) and stops at the first block hash that meets the target. The
//! caller builds the header once per batch, so the merkle root is computed
//! once and only the nonce field changes between attempts.

use bitcoin::hashes::{Hash, sha256d};
use bitcoin::{BlockHash, Target};

use crate::job::{Header, set_nonce};

/// Nonces tried per batch.
pub const BATCH_SIZE: u32 = 10_000;

/// A nonce whose block hash met the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoundNonce {
    pub nonce: u32,
    pub hash: BlockHash,
}

/// Result of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Hashes computed, including the winning one
    pub attempts: u64,

    pub found: Option<FoundNonce>,
}

/// Block hash of a serialized header.
pub fn header_hash(header: &Header) -> BlockHash {
    BlockHash::from_raw_hash(sha256d::Hash::hash(header))
}

/// Scan `batch_size` nonces from `start_nonce`, stopping at the first hit.
///
/// A hash meets the target when it is at or below it, compared as a
/// little-endian integer. The header's nonce field is left holding the last
/// nonce tried.
pub fn search_batch(
    header: &mut Header,
    target: Target,
    start_nonce: u32,
    batch_size: u32,
) -> BatchOutcome {
    let mut nonce = start_nonce;
    for attempt in 1..=u64::from(batch_size) {
        set_nonce(header, nonce);
        let hash = header_hash(header);
        if target.is_met_by(hash) {
            return BatchOutcome {
                attempts: attempt,
                found: Some(FoundNonce { nonce, hash }),
            };
        }
        nonce = nonce.wrapping_add(1);
    }

    BatchOutcome {
        attempts: u64::from(batch_size),
        found: None,
    }
}
