//! Stratum v1 message types and JSON-RPC serialization.
//!
//! This module defines the wire format for Stratum v1 protocol messages using
//! serde for JSON serialization, plus typed views of the payloads the worker
//! cares about (subscribe result, `mining.notify`, `mining.submit`).

use bitcoin::block::Version;
use bitcoin::hashes::Hash;
use bitcoin::{BlockHash, CompactTarget, TxMerkleNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{StratumError, StratumResult};
use crate::types::Extranonce2;

/// Request id of `mining.subscribe`.
pub const SUBSCRIBE_ID: u64 = 1;

/// Request id of `mining.authorize`.
pub const AUTHORIZE_ID: u64 = 2;

/// First request id handed out to `mining.submit`.
///
/// Share ids live above the control ids so a response can be routed by id
/// alone.
pub const FIRST_SHARE_ID: u64 = 100;

/// Mining job notification from pool (`mining.notify`).
///
/// Header fields are converted from Stratum's hex encodings into Rust
/// Bitcoin types on parse, so the header builder only has to fill in the
/// merkle root and nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNotification {
    /// Unique job identifier
    pub job_id: String,

    /// Previous block hash
    pub prev_hash: BlockHash,

    /// First part of coinbase transaction (before extranonce)
    pub coinbase1: Vec<u8>,

    /// Second part of coinbase transaction (after extranonce)
    pub coinbase2: Vec<u8>,

    /// Merkle branch hashes, in the order the pool sent them
    pub merkle_branches: Vec<TxMerkleNode>,

    /// Block version field
    pub version: Version,

    /// Encoded network difficulty (nbits)
    pub nbits: CompactTarget,

    /// Block timestamp (Unix epoch seconds)
    pub ntime: u32,

    /// If true, abandon all previous jobs
    pub clean_jobs: bool,
}

impl JobNotification {
    /// Parse from Stratum JSON array parameters.
    ///
    /// Every field is decoded and length-checked before anything is returned,
    /// so a malformed notify never produces a partial job.
    pub fn from_stratum_params(params: &[Value]) -> StratumResult<Self> {
        Self::parse(params).map_err(StratumError::ProtocolViolation)
    }

    fn parse(params: &[Value]) -> Result<Self, String> {
        if params.len() < 9 {
            return Err(format!(
                "mining.notify expects 9 params, got {}",
                params.len()
            ));
        }

        let job_id = params[0].as_str().ok_or("job_id not a string")?.to_string();
        let prev_hash = parse_block_hash(&params[1])?;
        let coinbase1 = parse_bytes(&params[2], "coinbase1")?;
        let coinbase2 = parse_bytes(&params[3], "coinbase2")?;

        let branches_json = params[4].as_array().ok_or("merkle_branches not an array")?;
        let merkle_branches = branches_json
            .iter()
            .map(|branch| {
                parse_fixed::<32>(branch, "merkle branch").map(TxMerkleNode::from_byte_array)
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Version, nbits and ntime are big-endian hex of exactly four bytes.
        let version = Version::from_consensus(parse_be_u32(&params[5], "version")? as i32);
        let nbits = CompactTarget::from_consensus(parse_be_u32(&params[6], "nbits")?);
        let ntime = parse_be_u32(&params[7], "ntime")?;
        let clean_jobs = params[8].as_bool().ok_or("clean_jobs not a bool")?;

        Ok(Self {
            job_id,
            prev_hash,
            coinbase1,
            coinbase2,
            merkle_branches,
            version,
            nbits,
            ntime,
            clean_jobs,
        })
    }
}

fn parse_bytes(value: &Value, field: &str) -> Result<Vec<u8>, String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("{} not a string", field))?;
    hex::decode(s).map_err(|e| format!("{} hex: {}", field, e))
}

fn parse_fixed<const N: usize>(value: &Value, field: &str) -> Result<[u8; N], String> {
    let bytes = parse_bytes(value, field)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| format!("{} wrong length: {} (expected {})", field, len, N))
}

fn parse_be_u32(value: &Value, field: &str) -> Result<u32, String> {
    parse_fixed::<4>(value, field).map(u32::from_be_bytes)
}

/// Parse Stratum's previous block hash.
///
/// Stratum sends the hash as eight 4-byte words, each written big-endian.
/// Reversing the bytes within every word gives the hash's internal byte
/// order, the one it has inside a serialized header.
fn parse_block_hash(value: &Value) -> Result<BlockHash, String> {
    let mut bytes = parse_fixed::<32>(value, "prev_hash")?;
    for word in bytes.chunks_exact_mut(4) {
        word.reverse();
    }
    Ok(BlockHash::from_byte_array(bytes))
}

/// Session parameters returned by `mining.subscribe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeResult {
    /// Pool-assigned extranonce1
    pub extranonce1: Vec<u8>,

    /// Width of the miner-controlled extranonce2, in bytes
    pub extranonce2_size: usize,
}

impl SubscribeResult {
    /// Parse the `result` of a subscribe response.
    ///
    /// The result is `[[subscriptions...], extranonce1, extranonce2_size]`;
    /// only elements 1 and 2 are used. The size may arrive as any integral
    /// JSON number (`4` or `4.0`).
    pub fn from_result(result: Option<&Value>) -> StratumResult<Self> {
        let arr = match result.and_then(Value::as_array) {
            Some(arr) if arr.len() >= 3 => arr,
            _ => return Err(StratumError::SubscriptionFailed("invalid response".into())),
        };

        let missing = || StratumError::SubscriptionFailed("missing extraNonce data".into());

        let extranonce1 = match arr[1].as_str() {
            Some(s) if !s.is_empty() => s,
            _ => return Err(missing()),
        };
        let extranonce2_size = arr[2]
            .as_f64()
            .filter(|size| *size >= 0.0 && size.fract() == 0.0)
            .ok_or_else(missing)?;

        let extranonce1 = hex::decode(extranonce1).map_err(|e| {
            StratumError::SubscriptionFailed(format!("extranonce1 hex: {}", e))
        })?;

        Ok(Self {
            extranonce1,
            // Float-to-int `as` saturates; the size is range-checked later.
            extranonce2_size: extranonce2_size as usize,
        })
    }
}

/// Parameters for submitting a share to the pool.
#[derive(Debug, Clone)]
pub struct SubmitParams {
    /// Worker username (wallet address)
    pub username: String,

    /// Job ID this share is for
    pub job_id: String,

    /// Extranonce2 used to build the coinbase
    pub extranonce2: Extranonce2,

    /// Job timestamp, echoed back as received
    pub ntime: u32,

    /// Nonce found
    pub nonce: u32,
}

impl SubmitParams {
    /// Convert to the positional hex-string array of `mining.submit`.
    ///
    /// ntime and the nonce are zero-padded big-endian hex (cgminer's `%08x`).
    pub fn to_stratum_json(&self) -> Vec<Value> {
        vec![
            Value::String(self.username.clone()),
            Value::String(self.job_id.clone()),
            Value::String(self.extranonce2.to_string()),
            Value::String(format!("{:08x}", self.ntime)),
            Value::String(format!("{:08x}", self.nonce)),
        ]
    }
}

/// Extract a human-readable reason from a pool error value.
///
/// Pools usually send `[code, "message", traceback]` and the message is
/// used. Without one, an array reads as its elements joined by commas.
pub fn error_reason(error: Option<&Value>) -> String {
    match error {
        None | Some(Value::Null) => "Unknown error".to_string(),
        Some(Value::Array(arr)) => match arr.get(1) {
            Some(msg) if is_truthy(msg) => plain_text(msg),
            _ => plain_text(&Value::Array(arr.clone())),
        },
        Some(other) => plain_text(other),
    }
}

/// Render a JSON value the way pools' clients have always printed them:
/// strings bare, null empty, arrays comma-joined.
fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(plain_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// JavaScript-style truthiness, which is how pools' results have
/// historically been read.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// JSON-RPC message envelope.
///
/// Stratum uses a simplified JSON-RPC format where messages can be:
/// - Requests (have method and params, may have id)
/// - Responses (have id and result or error)
/// - Notifications (have method and params, `id: null`)
///
/// Stratum v1 predates JSON-RPC 2.0: notifications carry `id: null` rather
/// than omitting it, errors are arrays, and there is no version field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Request or notification from client or server
    Request {
        /// Message ID (null for notifications)
        id: Option<u64>,
        /// Method name (e.g., "mining.notify", "mining.subscribe")
        method: String,
        /// Method parameters
        #[serde(default)]
        params: Value,
    },

    /// Response to a request
    Response {
        /// Message ID matching the request
        id: u64,
        /// Result value (present on success)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Error value (present on failure)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
}

impl JsonRpcMessage {
    /// Create a new request message.
    pub fn request(id: u64, method: impl Into<String>, params: Value) -> Self {
        JsonRpcMessage::Request {
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Create a notification (request without ID).
    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        JsonRpcMessage::Request {
            id: None,
            method: method.into(),
            params,
        }
    }

    /// `mining.subscribe` with our user agent.
    pub fn subscribe(user_agent: &str) -> Self {
        Self::request(SUBSCRIBE_ID, "mining.subscribe", Value::from(vec![user_agent]))
    }

    /// `mining.authorize` with the worker's credentials.
    pub fn authorize(username: &str, password: &str) -> Self {
        Self::request(
            AUTHORIZE_ID,
            "mining.authorize",
            Value::from(vec![username, password]),
        )
    }

    /// `mining.submit` carrying a found share.
    pub fn submit(id: u64, params: &SubmitParams) -> Self {
        Self::request(id, "mining.submit", Value::Array(params.to_stratum_json()))
    }
}

#[cfg(test)]
impl JsonRpcMessage {
    /// Get the message ID if present.
    pub fn id(&self) -> Option<u64> {
        match self {
            JsonRpcMessage::Request { id, .. } => *id,
            JsonRpcMessage::Response { id, .. } => Some(*id),
        }
    }

    /// Check if this is a notification (request without ID).
    pub fn is_notification(&self) -> bool {
        matches!(self, JsonRpcMessage::Request { id: None, .. })
    }

    /// Get the method name for requests.
    pub fn method(&self) -> Option<&str> {
        match self {
            JsonRpcMessage::Request { method, .. } => Some(method),
            JsonRpcMessage::Response { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_blocks::block_881423;
    use serde_json::json;

    #[test]
    fn test_parse_mining_notify() {
        let json = json!({
            "id": null,
            "method": "mining.notify",
            "params": [
                "job1",
                "prevhash",
                "coinbase1",
                "coinbase2",
                ["merkle1", "merkle2"],
                "20000000",
                "1a00ffff",
                "504e86b9",
                true
            ]
        });

        let msg: JsonRpcMessage = serde_json::from_value(json).unwrap();
        assert!(msg.is_notification());
        assert_eq!(msg.method(), Some("mining.notify"));

        match msg {
            JsonRpcMessage::Request { params, .. } => {
                let params_array = params.as_array().expect("params should be an array");
                assert_eq!(params_array.len(), 9);
                assert_eq!(params_array[0], "job1");
                assert_eq!(params_array[8], true);
            }
            _ => panic!("Expected Request variant"),
        }
    }

    #[test]
    fn test_parse_notification_without_id_field() {
        let msg: JsonRpcMessage =
            serde_json::from_str(r#"{"method":"mining.set_difficulty","params":[2]}"#).unwrap();
        assert!(msg.is_notification());
    }

    #[test]
    fn test_parse_response() {
        let json = json!({
            "id": 1,
            "result": true,
            "error": null
        });

        let msg: JsonRpcMessage = serde_json::from_value(json).unwrap();
        assert_eq!(msg.id(), Some(1));

        match msg {
            JsonRpcMessage::Response { result, error, .. } => {
                assert_eq!(result, Some(json!(true)));
                assert_eq!(error, None);
            }
            _ => panic!("Expected Response variant"),
        }
    }

    #[test]
    fn test_create_requests() {
        let serialized = serde_json::to_string(&JsonRpcMessage::subscribe("MoonshotMiner/1.0"))
            .unwrap();
        assert_eq!(
            serialized,
            r#"{"id":1,"method":"mining.subscribe","params":["MoonshotMiner/1.0"]}"#
        );

        let serialized = serde_json::to_string(&JsonRpcMessage::authorize("bc1qwallet", "x"))
            .unwrap();
        assert_eq!(
            serialized,
            r#"{"id":2,"method":"mining.authorize","params":["bc1qwallet","x"]}"#
        );
    }

    #[test]
    fn test_create_notification() {
        let msg = JsonRpcMessage::notification("mining.set_difficulty", json!([512]));

        assert!(msg.is_notification());
        assert_eq!(msg.id(), None);

        let serialized = serde_json::to_string(&msg).unwrap();
        assert!(serialized.contains("\"id\":null"));
    }

    #[test]
    fn test_parse_malformed_error_response() {
        // Some pools send error responses with id=null, which matches neither
        // variant (Response needs a numeric id).
        let json_str = r#"{"id":null,"result":null,"error":[20,"Suggest difficulty validation error",", null"]}"#;

        let result = serde_json::from_str::<JsonRpcMessage>(json_str);
        assert!(result.is_err());
    }

    #[test]
    fn test_subscribe_result() {
        let result = json!([[["mining.notify", "ae6812eb4cd7735a302a8a9dd95cf71f"]], "08000002", 4]);
        let parsed = SubscribeResult::from_result(Some(&result)).unwrap();
        assert_eq!(parsed.extranonce1, vec![0x08, 0x00, 0x00, 0x02]);
        assert_eq!(parsed.extranonce2_size, 4);
    }

    #[test]
    fn test_subscribe_result_accepts_integral_float_size() {
        let parsed = SubscribeResult::from_result(Some(&json!([[], "08000002", 4.0]))).unwrap();
        assert_eq!(parsed.extranonce2_size, 4);

        assert!(SubscribeResult::from_result(Some(&json!([[], "0800", 4.5]))).is_err());
        assert!(SubscribeResult::from_result(Some(&json!([[], "0800", -4]))).is_err());
    }

    #[test]
    fn test_subscribe_result_rejects_bad_shapes() {
        let err = SubscribeResult::from_result(None).unwrap_err();
        assert!(matches!(err, StratumError::SubscriptionFailed(_)));
        assert_eq!(err.to_string(), "Subscribe failed: invalid response");

        let err = SubscribeResult::from_result(Some(&json!([[], "", 4]))).unwrap_err();
        assert_eq!(err.to_string(), "Subscribe failed: missing extraNonce data");

        assert!(SubscribeResult::from_result(Some(&json!(true))).is_err());
        assert!(SubscribeResult::from_result(Some(&json!([[], "0800"]))).is_err());
        assert!(SubscribeResult::from_result(Some(&json!([[], "0800", "4"]))).is_err());
        assert!(SubscribeResult::from_result(Some(&json!([[], "zz", 4]))).is_err());
    }

    #[test]
    fn test_submit_params_to_stratum_json() {
        let params = SubmitParams {
            username: "worker1".to_string(),
            job_id: "job123".to_string(),
            extranonce2: Extranonce2::with_value(0xdeadbeef, 4).unwrap(),
            ntime: 0x65432100,
            nonce: 0x12345678,
        };

        let json = params.to_stratum_json();

        assert_eq!(json.len(), 5);
        assert_eq!(json[0], "worker1");
        assert_eq!(json[1], "job123");
        assert_eq!(json[2], "deadbeef");
        assert_eq!(json[3], "65432100");
        assert_eq!(json[4], "12345678");
    }

    #[test]
    fn test_submit_values_are_zero_padded() {
        let params = SubmitParams {
            username: "w".to_string(),
            job_id: "j".to_string(),
            extranonce2: Extranonce2::new(2).unwrap(),
            ntime: 1,
            nonce: 0xab,
        };
        let json = params.to_stratum_json();
        assert_eq!(json[2], "0000");
        assert_eq!(json[3], "00000001");
        assert_eq!(json[4], "000000ab");
    }

    #[test]
    fn test_error_reason() {
        assert_eq!(
            error_reason(Some(&json!([23, "Low difficulty share", null]))),
            "Low difficulty share"
        );
        assert_eq!(error_reason(Some(&json!("Stale"))), "Stale");
        assert_eq!(error_reason(Some(&json!([21]))), "21");
        assert_eq!(error_reason(Some(&json!([21, null, null]))), "21,,");
        assert_eq!(error_reason(Some(&json!([22, "", "trace"]))), "22,,trace");
        assert_eq!(error_reason(None), "Unknown error");
        assert_eq!(error_reason(Some(&Value::Null)), "Unknown error");
    }

    #[test]
    fn test_is_truthy() {
        for value in [json!(true), json!(1), json!("ok"), json!([]), json!({})] {
            assert!(is_truthy(&value), "{}", value);
        }
        for value in [json!(false), json!(0), json!(""), Value::Null] {
            assert!(!is_truthy(&value), "{}", value);
        }
    }

    #[test]
    fn test_job_notification_minimal_params() {
        let params = json!([
            "job1",
            "0000000000000000000000000000000000000000000000000000000000000000",
            "aa",
            "bb",
            [],
            "20000000",
            "1d00ffff",
            "5a5a5a5a",
            false
        ]);

        let job = JobNotification::from_stratum_params(params.as_array().unwrap()).unwrap();

        assert_eq!(job.job_id, "job1");
        assert_eq!(job.prev_hash, BlockHash::all_zeros());
        assert_eq!(job.coinbase1, vec![0xaa]);
        assert_eq!(job.coinbase2, vec![0xbb]);
        assert!(job.merkle_branches.is_empty());
        assert_eq!(job.version, Version::from_consensus(0x20000000));
        assert_eq!(job.nbits, CompactTarget::from_consensus(0x1d00ffff));
        assert_eq!(job.ntime, 0x5a5a5a5a);
        assert!(!job.clean_jobs);
    }

    #[test]
    fn test_job_notification_rejects_bad_fields() {
        let good = block_881423::notify_params();

        let mut short = good.clone();
        short.truncate(8);
        let err = JobNotification::from_stratum_params(&short).unwrap_err();
        assert!(matches!(err, StratumError::ProtocolViolation(_)));

        let mut bad_prev = good.clone();
        bad_prev[1] = json!("deadbeef");
        assert!(JobNotification::from_stratum_params(&bad_prev).is_err());

        let mut bad_version = good.clone();
        bad_version[5] = json!("200000");
        assert!(JobNotification::from_stratum_params(&bad_version).is_err());

        let mut bad_branch = good.clone();
        bad_branch[4] = json!(["zz"]);
        assert!(JobNotification::from_stratum_params(&bad_branch).is_err());

        let mut bad_clean = good;
        bad_clean[8] = json!("yes");
        assert!(JobNotification::from_stratum_params(&bad_clean).is_err());
    }

    #[test]
    fn test_job_notification_from_real_block() {
        let job = JobNotification::from_stratum_params(&block_881423::notify_params()).unwrap();

        assert_eq!(job.job_id, block_881423::JOB_ID);
        assert_eq!(job.merkle_branches.len(), 11);
        assert_eq!(job.version, Version::from_consensus(0x2e596000));
        assert_eq!(job.ntime, 0x679ac169);
        assert_eq!(job.nbits, CompactTarget::from_consensus(0x17029a8a));
        assert!(job.clean_jobs);

        // Block explorers show the previous block's hash in display order.
        assert_eq!(
            job.prev_hash.to_string(),
            block_881423::PREV_BLOCK_HASH
        );
    }
}
