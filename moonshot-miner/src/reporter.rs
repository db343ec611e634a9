//! Events the worker reports to its host.
//!
//! The host only ever sees these four event kinds; it never touches worker
//! state directly. Delivery is fire-and-forget: if the host has stopped
//! listening the event is dropped and the worker carries on.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

use crate::types::HashRate;

/// Event emitted by the worker.
///
/// Serializes as `{"type": "<kind>", "payload": <value>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum WorkerEvent {
    /// Connection and session progress
    Status(String),

    /// Something went wrong; the worker keeps running
    Error(String),

    /// Share submitted or accepted
    Share(String),

    /// Hash rate of the last batch, in hashes per second
    Hashrate(HashRate),
}

impl WorkerEvent {
    pub fn status(msg: impl Into<String>) -> Self {
        WorkerEvent::Status(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        WorkerEvent::Error(msg.into())
    }

    pub fn share(msg: impl Into<String>) -> Self {
        WorkerEvent::Share(msg.into())
    }
}

/// Receiving side of a [`Reporter`].
pub type EventReceiver = mpsc::UnboundedReceiver<WorkerEvent>;

/// Sends [`WorkerEvent`]s to the host.
#[derive(Debug, Clone)]
pub struct Reporter {
    tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl Reporter {
    /// Create a reporter and the receiver the host reads from.
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event. Never blocks and never fails.
    pub fn report(&self, event: WorkerEvent) {
        if let Err(e) = self.tx.send(event) {
            trace!(event = ?e.0, "Host not listening, event dropped");
        }
    }
}
