//! Daemon lifecycle for moonshot-miner.
//!
//! The daemon is the worker's host: it starts the worker, consumes the
//! events it reports, keeps a coarse [`MinerState`] for display, and stops
//! everything on SIGINT or SIGTERM.

use std::fmt;

use tokio::signal::unix::{self, SignalKind};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::config::WorkerConfig;
use crate::reporter::{EventReceiver, Reporter, WorkerEvent};
use crate::tracing::prelude::*;
use crate::types::HashRate;
use crate::worker::Worker;

/// What the miner is doing, as a host would show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinerState {
    #[default]
    Idle,
    Connecting,
    Mining,
    /// A share was just submitted or accepted
    Share,
    Error,
}

impl fmt::Display for MinerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MinerState::Idle => "idle",
            MinerState::Connecting => "connecting",
            MinerState::Mining => "mining",
            MinerState::Share => "share",
            MinerState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Host-side view of the worker, folded from its events.
#[derive(Debug, Default)]
pub struct MinerStatus {
    pub state: MinerState,
    pub last_message: String,
    pub hashrate: HashRate,
    pub shares_submitted: u64,
    pub shares_accepted: u64,
}

impl MinerStatus {
    /// Fold one event into the status.
    pub fn apply(&mut self, event: &WorkerEvent) {
        match event {
            WorkerEvent::Status(msg) => {
                self.state = if msg.contains("Running") || msg.contains("Authorized") {
                    MinerState::Mining
                } else if msg.contains("Connecting") || msg.contains("Connected") {
                    MinerState::Connecting
                } else if msg.contains("Disconnected") {
                    MinerState::Idle
                } else {
                    self.state
                };
                self.last_message = msg.clone();
            }
            WorkerEvent::Error(msg) => {
                self.state = MinerState::Error;
                self.last_message = msg.clone();
            }
            WorkerEvent::Share(msg) => {
                self.state = MinerState::Share;
                if msg.contains("ACCEPTED") {
                    self.shares_accepted += 1;
                } else {
                    self.shares_submitted += 1;
                }
                self.last_message = msg.clone();
            }
            WorkerEvent::Hashrate(rate) => {
                self.hashrate = *rate;
                // Keep a share or error on display until the next status.
                if self.state == MinerState::Idle || self.state == MinerState::Connecting {
                    self.state = MinerState::Mining;
                }
            }
        }
    }
}

/// Log events and track status until the worker's reporter goes away.
async fn consume_events(mut events: EventReceiver) -> MinerStatus {
    let mut status = MinerStatus::default();
    while let Some(event) = events.recv().await {
        status.apply(&event);
        match &event {
            WorkerEvent::Hashrate(rate) => debug!(hashrate = %rate, "Hash rate"),
            WorkerEvent::Error(msg) => warn!(state = %status.state, "{}", msg),
            WorkerEvent::Status(msg) | WorkerEvent::Share(msg) => {
                info!(state = %status.state, "{}", msg)
            }
        }
        if let Ok(json) = serde_json::to_string(&event) {
            trace!(event = %json, "Worker event");
        }
    }
    status
}

/// The main daemon that coordinates the worker.
pub struct Daemon {
    config: WorkerConfig,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Daemon {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn run(self) -> anyhow::Result<()> {
        let (reporter, events) = Reporter::channel();

        let worker = Worker::new(self.config.clone(), reporter, self.shutdown.clone());
        self.tracker.spawn(worker.run());
        let events_task = self.tracker.spawn(consume_events(events));
        self.tracker.close();

        info!(pool = %self.config.pool, "Started.");

        let mut sigint = unix::signal(SignalKind::interrupt())?;
        let mut sigterm = unix::signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }

        trace!("Shutting down.");
        self.shutdown.cancel();
        self.tracker.wait().await;

        let status = events_task.await?;
        info!(
            submitted = status.shares_submitted,
            accepted = status.shares_accepted,
            "Exiting."
        );

        Ok(())
    }
}
