//! Stratum v1 mining protocol.
//!
//! The protocol is JSON-RPC over TCP with newline-delimited messages.
//!
//! # Protocol Overview
//!
//! Stratum v1 is a bidirectional, event-driven protocol:
//!
//! - **Client requests**: `mining.subscribe` (id 1), `mining.authorize`
//!   (id 2), `mining.submit` (ids from 100 upward)
//! - **Server notifications**: `mining.notify` (new work),
//!   `mining.set_difficulty`, `client.reconnect`
//! - **Server responses**: results for client requests (value or error array)
//!
//! # Layout
//!
//! - [`connection`]: line framing over TCP, and the [`Transport`] seam
//! - [`messages`]: wire types
//! - [`protocol`]: the I/O-free session state machine
//! - [`shares`]: outstanding submissions keyed by request id

pub mod connection;
mod error;
pub mod messages;
pub mod protocol;
pub mod shares;

pub use connection::{Connection, MAX_LINE_LEN, PoolAddress, Transport};
pub use error::{StratumError, StratumResult};
pub use messages::{JobNotification, JsonRpcMessage, SubmitParams, SubscribeResult};
pub use protocol::{Action, ProtocolHandler, SessionState};
pub use shares::{PendingShare, ResolvedShare, ShareTracker, ShareVerdict};
