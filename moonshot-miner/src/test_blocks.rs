//! Test data from real Bitcoin blocks.
//!
//! Header construction, merkle folding and share checks are validated
//! against a block that was actually mined, expressed the way a pool would
//! have delivered it over Stratum.

/// Block 881,423
///
/// Mined on January 30, 2025 by a small self-hosted pool during the 256
/// Foundation's "Telehash" fundraiser. The coinbase is split around an
/// 8-byte extranonce (4 bytes extranonce1, 4 bytes extranonce2) exactly
/// where the pool placed it, so folding the branches below reproduces the
/// block's merkle root.
pub mod block_881423 {
    use serde_json::{Value, json};

    /// Job id as announced in `mining.notify`; any string works.
    pub const JOB_ID: &str = "6a7d2f";

    /// Previous block hash in Stratum's word-swapped wire order.
    pub const PREV_HASH: &str = "8a6ac9e3fe15ca70f8995e21434cb64ac4d2b5e10001543b0000000000000000";

    /// Block 881,422's hash in the usual display order.
    pub const PREV_BLOCK_HASH: &str =
        "00000000000000000001543bc4d2b5e1434cb64af8995e21fe15ca708a6ac9e3";

    /// Coinbase up to the extranonce.
    pub const COINBASE1: &str = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff3d030f730d000469c19a67";

    /// Coinbase after the extranonce.
    pub const COINBASE2: &str = "9a67b6600000000000000a41706f6c6c6f192f6d696e65642062792032353620466f756e646174696f6e2fffffffff0275aac01200000000160014c64b1b9283ba1ea86bb9e7b696b0c8f68dad04000000000000000000266a24aa21a9edb395560ab72068c2afb1d7e6c7db26b813482089d2c4d2471b9036c5e826140600000000";

    /// Pool-assigned extranonce1.
    pub const EXTRANONCE1: &str = "04830cee";

    /// Extranonce2 counter value the winning share used.
    pub const EXTRANONCE2: u64 = 0x220cf1ad;

    /// Extranonce2 width in bytes.
    pub const EXTRANONCE2_SIZE: usize = 4;

    /// Merkle branch hashes in pool order.
    pub const MERKLE_BRANCHES: [&str; 11] = [
        "4282357ab0a2f4e8e562c8c5eae1d63b559068f9072374b72e26b88ac841908f",
        "c2bbae90d06f8025ade3516ca2e42d79318b6e56fccb9609df85a654a8341068",
        "cbb30084acbcb5ce6d5436e853bc612466df0c00702be6f51d47072f1a5d0480",
        "bb092e533f70b79246fc9e4bdc9b81ac8332e56f2651e3b237a150d6d807b081",
        "0d32959988733447cb340326a1fe4d3c2cff5d636e32a4e08c3fc5a234f6f6bc",
        "8ba3477940924a90067cff3dd30bc46916cf4c2f73fb6229b8f8197b83b6ddb9",
        "3fe97cc5dec1cddd66c9d3780888c145c12418590cd983c4871b1bf03fabbf9e",
        "bd1c6a3bcd0ebaa0eca54d9c802540f312c7705435601d776b4f59bb52cff67d",
        "8638c10190b8f4f558bafdbb57f46226c349a83f229f431143ae75e425fb5cbd",
        "6d6f4eae41cccb21a7c97ac496d9f89b8a4f772389b76f7691519dda38264221",
        "82dad7a1e2613af0e61f77f03d6208c83e72f917dade4235cc35e37ee3ad6e3f",
    ];

    pub const VERSION: &str = "2e596000";
    pub const NBITS: &str = "17029a8a";
    pub const NTIME: &str = "679ac169";

    /// Winning nonce.
    pub const NONCE: u32 = 0xff05fb02;

    /// Merkle root, in the byte order it occupies in the header.
    pub const MERKLE_ROOT: &str = "76f63a35f1b8b5016d3eb0cce2eebbdf58bf8fbea4e870c8f770346bdfcf622d";

    /// The complete 80-byte header as it appears in the blockchain.
    pub const HEADER: &str = "0060592ee3c96a8a70ca15fe215e99f84ab64c43e1b5d2c43b540100000000000000000076f63a35f1b8b5016d3eb0cce2eebbdf58bf8fbea4e870c8f770346bdfcf622d69c19a678a9a021702fb05ff";

    /// Block hash in the usual display order (digest bytes reversed).
    pub const BLOCK_HASH: &str = "0000000000000000000269d52c24ea451225613aab095d90d771d4e29aa96cdd";

    /// The `mining.notify` params a pool would have sent for this block.
    pub fn notify_params() -> Vec<Value> {
        vec![
            json!(JOB_ID),
            json!(PREV_HASH),
            json!(COINBASE1),
            json!(COINBASE2),
            json!(MERKLE_BRANCHES),
            json!(VERSION),
            json!(NBITS),
            json!(NTIME),
            json!(true),
        ]
    }

    /// A complete `mining.notify` line, newline-terminated.
    pub fn notify_line() -> String {
        let msg = json!({
            "id": null,
            "method": "mining.notify",
            "params": notify_params(),
        });
        format!("{}\n", msg)
    }

    /// Subscribe response carrying this block's extranonce1.
    pub fn subscribe_result() -> Value {
        json!([
            [["mining.set_difficulty", "b4b6693b72a50c7116db18d6497cac52"],
             ["mining.notify", "ae6812eb4cd7735a302a8a9dd95cf71f"]],
            EXTRANONCE1,
            EXTRANONCE2_SIZE
        ])
    }

    /// The same coinbase, split so that a fresh (all-zero) 4-byte
    /// extranonce2 lands on four zero bytes that were already in the
    /// transaction. A worker that starts counting at zero after a clean job
    /// therefore rebuilds the block's exact header.
    pub mod zero_extranonce2 {
        use super::*;

        pub const COINBASE1: &str = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff3d030f730d000469c19a6704830cee220cf1ad9a67b6";
        pub const EXTRANONCE1: &str = "60";
        pub const COINBASE2: &str = "00000a41706f6c6c6f192f6d696e65642062792032353620466f756e646174696f6e2fffffffff0275aac01200000000160014c64b1b9283ba1ea86bb9e7b696b0c8f68dad04000000000000000000266a24aa21a9edb395560ab72068c2afb1d7e6c7db26b813482089d2c4d2471b9036c5e826140600000000";

        pub fn notify_params() -> Vec<Value> {
            let mut params = super::notify_params();
            params[2] = json!(COINBASE1);
            params[3] = json!(COINBASE2);
            params
        }

        pub fn subscribe_result() -> Value {
            json!([[], EXTRANONCE1, EXTRANONCE2_SIZE])
        }
    }
}
