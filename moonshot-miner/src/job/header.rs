//! 80-byte block header assembly.
//!
//! The job's fields are already Rust Bitcoin types (see
//! [`JobNotification`]), so a header is a [`BlockHeader`] with the merkle
//! root filled in for the current extranonce2. The search loop works on its
//! consensus encoding, where only the nonce at offset 76 changes between
//! attempts.

use bitcoin::block::Header as BlockHeader;
use bitcoin::consensus::serialize;

use super::merkle;
use crate::stratum_v1::JobNotification;
use crate::types::Extranonce2;

pub const HEADER_LEN: usize = 80;

const NONCE_OFFSET: usize = 76;

/// Serialized block header.
pub type Header = [u8; HEADER_LEN];

/// Block header for `job` with a zero nonce.
pub fn block_header(
    job: &JobNotification,
    extranonce1: &[u8],
    extranonce2: &Extranonce2,
) -> BlockHeader {
    let merkle_root = merkle::merkle_root(
        &job.coinbase1,
        extranonce1,
        extranonce2,
        &job.coinbase2,
        &job.merkle_branches,
    );

    BlockHeader {
        version: job.version,
        prev_blockhash: job.prev_hash,
        merkle_root,
        time: job.ntime,
        bits: job.nbits,
        nonce: 0,
    }
}

/// Serialized header for `job` with the nonce field zeroed.
pub fn build_header(job: &JobNotification, extranonce1: &[u8], extranonce2: &Extranonce2) -> Header {
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&serialize(&block_header(job, extranonce1, extranonce2)));
    header
}

/// Write `nonce` into the header's nonce field.
pub fn set_nonce(header: &mut Header, nonce: u32) {
    header[NONCE_OFFSET..].copy_from_slice(&nonce.to_le_bytes());
}
