//! Session state machine for one pool connection.
//!
//! [`ProtocolHandler`] does no I/O. The worker feeds it parsed messages and
//! connection lifecycle changes; it mutates the [`JobStore`] and
//! [`ShareTracker`] and answers with [`Action`]s for the worker to carry out
//! (messages to send, events to report).
//!
//! ```text
//! Disconnected -> Connecting -> Subscribed -> Authorized
//!                      \______________\_______ Error (until reconnect)
//! ```

use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::StratumError;
use super::messages::{
    AUTHORIZE_ID, FIRST_SHARE_ID, JobNotification, JsonRpcMessage, SUBSCRIBE_ID, SubscribeResult,
    SubmitParams, error_reason, is_truthy,
};
use super::shares::{ShareTracker, ShareVerdict};
use crate::job::JobStore;
use crate::reporter::WorkerEvent;
use crate::types::Difficulty;

/// Password sent with `mining.authorize`; pools ignore it.
pub const POOL_PASSWORD: &str = "x";

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Subscribed,
    Authorized,
    /// Subscribe or authorize failed; nothing more happens until reconnect.
    Error,
}

/// Work for the caller after handling an input.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Write a message to the pool
    Send(JsonRpcMessage),

    /// Forward an event to the host
    Report(WorkerEvent),

    /// New work is available; restart the search without waiting out the
    /// idle delay
    Wake,

    /// Pool asked us to reconnect
    Reconnect,
}

/// Stratum v1 session logic.
#[derive(Debug)]
pub struct ProtocolHandler {
    username: String,
    user_agent: String,
    state: SessionState,
}

impl ProtocolHandler {
    pub fn new(username: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            user_agent: user_agent.into(),
            state: SessionState::Disconnected,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.state == SessionState::Authorized
    }

    /// About to open the TCP connection.
    pub fn on_connecting(&mut self) -> Vec<Action> {
        self.state = SessionState::Connecting;
        vec![Action::Report(WorkerEvent::status("Connecting..."))]
    }

    /// TCP connection is up: subscribe.
    pub fn on_connected(&mut self) -> Vec<Action> {
        vec![
            Action::Report(WorkerEvent::status("Connected")),
            Action::Send(JsonRpcMessage::subscribe(&self.user_agent)),
        ]
    }

    /// Connection is gone. Everything tied to it is discarded.
    pub fn on_disconnected(&mut self, store: &mut JobStore, shares: &mut ShareTracker) -> Vec<Action> {
        self.state = SessionState::Disconnected;
        store.clear();
        let dropped = shares.clear();
        if dropped > 0 {
            debug!(dropped, "Discarded pending shares");
        }
        vec![Action::Report(WorkerEvent::status("Disconnected"))]
    }

    /// Build the `mining.submit` for a found nonce and register it.
    ///
    /// The caller advances extranonce2 afterwards; `params` must carry the
    /// value the header was built with.
    pub fn submit_share(
        &mut self,
        params: &SubmitParams,
        shares: &mut ShareTracker,
        now: Instant,
    ) -> Vec<Action> {
        let id = shares.register(&params.job_id, now);
        info!(
            id,
            job_id = %params.job_id,
            extranonce2 = %params.extranonce2,
            nonce = format!("{:#010x}", params.nonce),
            pending = shares.pending_count(),
            "Submitting share"
        );
        vec![
            Action::Send(JsonRpcMessage::submit(id, params)),
            Action::Report(WorkerEvent::share(format!("Share submitted (id: {})", id))),
        ]
    }

    /// Handle one message from the pool.
    pub fn handle_message(
        &mut self,
        msg: JsonRpcMessage,
        store: &mut JobStore,
        shares: &mut ShareTracker,
        now: Instant,
    ) -> Vec<Action> {
        match msg {
            JsonRpcMessage::Response { id, result, error } => {
                self.handle_response(id, result.as_ref(), error.as_ref(), store, shares, now)
            }
            JsonRpcMessage::Request { id, method, params } => {
                if id.is_some() {
                    debug!(method = %method, "Server sent request (not notification)");
                }
                self.handle_notification(&method, &params, store)
            }
        }
    }

    fn handle_response(
        &mut self,
        id: u64,
        result: Option<&Value>,
        error: Option<&Value>,
        store: &mut JobStore,
        shares: &mut ShareTracker,
        now: Instant,
    ) -> Vec<Action> {
        match id {
            SUBSCRIBE_ID => self.handle_subscribe_response(result, store),
            AUTHORIZE_ID => self.handle_authorize_response(result, error),
            id if id >= FIRST_SHARE_ID => {
                let Some(resolved) = shares.resolve(id, result, error, now) else {
                    debug!(id, "Response for unknown share, ignoring");
                    return Vec::new();
                };
                let latency_ms = resolved.latency.as_millis() as u64;
                match resolved.verdict {
                    ShareVerdict::Accepted => {
                        info!(id, job_id = %resolved.job_id, latency_ms, "Share accepted");
                        vec![Action::Report(WorkerEvent::share(format!(
                            "Share ACCEPTED (id: {})",
                            id
                        )))]
                    }
                    ShareVerdict::Rejected(reason) => {
                        warn!(id, job_id = %resolved.job_id, latency_ms, reason = %reason, "Share rejected");
                        vec![Action::Report(WorkerEvent::error(format!(
                            "Share rejected: {}",
                            reason
                        )))]
                    }
                }
            }
            id => {
                debug!(id, "Unexpected response id, ignoring");
                Vec::new()
            }
        }
    }

    fn handle_subscribe_response(
        &mut self,
        result: Option<&Value>,
        store: &mut JobStore,
    ) -> Vec<Action> {
        let subscribed = SubscribeResult::from_result(result).and_then(|subscribed| {
            store
                .set_session(subscribed.extranonce1.clone(), subscribed.extranonce2_size)
                .map_err(|e| StratumError::SubscriptionFailed(e.to_string()))?;
            Ok(subscribed)
        });

        let subscribed = match subscribed {
            Ok(subscribed) => subscribed,
            Err(e) => {
                warn!(error = %e, "Subscribe failed");
                self.state = SessionState::Error;
                return vec![Action::Report(WorkerEvent::error(e.to_string()))];
            }
        };

        debug!(
            extranonce1 = %hex::encode(&subscribed.extranonce1),
            extranonce2_size = subscribed.extranonce2_size,
            "Subscribed"
        );
        self.state = SessionState::Subscribed;
        vec![Action::Send(JsonRpcMessage::authorize(
            &self.username,
            POOL_PASSWORD,
        ))]
    }

    fn handle_authorize_response(
        &mut self,
        result: Option<&Value>,
        error: Option<&Value>,
    ) -> Vec<Action> {
        if result.is_some_and(is_truthy) {
            info!(username = %self.username, "Authorized");
            self.state = SessionState::Authorized;
            vec![
                Action::Report(WorkerEvent::status("Authorized")),
                Action::Wake,
            ]
        } else {
            let err = StratumError::AuthorizationFailed(error_reason(error));
            warn!(username = %self.username, error = %err, "Pool refused worker");
            self.state = SessionState::Error;
            vec![Action::Report(WorkerEvent::error("Auth Failed"))]
        }
    }

    fn handle_notification(
        &mut self,
        method: &str,
        params: &Value,
        store: &mut JobStore,
    ) -> Vec<Action> {
        match method {
            "mining.notify" => self.handle_mining_notify(params, store),
            "mining.set_difficulty" => {
                match params.as_array().and_then(|a| a.first()).and_then(Value::as_f64) {
                    Some(value) => {
                        let difficulty = Difficulty::from_pool(value);
                        let target = store.set_difficulty(difficulty);
                        info!(
                            difficulty = %difficulty,
                            target = %hex::encode(target.to_be_bytes()),
                            "Difficulty set"
                        );
                    }
                    None => warn!(params = %params, "Ignoring non-numeric set_difficulty"),
                }
                Vec::new()
            }
            "client.reconnect" => {
                info!("Pool requested reconnect");
                vec![Action::Reconnect]
            }
            "client.show_message" => {
                info!(message = %params, "Message from pool");
                Vec::new()
            }
            _ => {
                debug!(method = %method, "Unknown notification method");
                Vec::new()
            }
        }
    }

    fn handle_mining_notify(&mut self, params: &Value, store: &mut JobStore) -> Vec<Action> {
        let parsed = params
            .as_array()
            .ok_or_else(|| StratumError::ProtocolViolation("params not an array".into()))
            .and_then(|arr| JobNotification::from_stratum_params(arr));

        match parsed {
            Ok(job) => {
                info!(job_id = %job.job_id, clean_jobs = job.clean_jobs, "New job");
                store.replace_job(job);
                vec![
                    Action::Report(WorkerEvent::status("Running (New Job)")),
                    Action::Wake,
                ]
            }
            Err(e) => {
                warn!(error = %e, "Invalid mining.notify");
                vec![Action::Report(WorkerEvent::error(
                    "Invalid mining.notify params",
                ))]
            }
        }
    }
}

#[cfg(test)]
impl ProtocolHandler {
    pub fn state(&self) -> SessionState {
        self.state
    }
}
