//! The mining worker.
//!
//! One task owns all mining state: the pool connection, session, current job,
//! pending shares and batch pacing. Its event loop waits on three things at
//! once:
//!
//! - the next frame from the pool,
//! - the batch timer from the [`Scheduler`],
//! - the shutdown token.
//!
//! Hash batches run inline between socket events, which keeps the whole
//! worker a single sequential unit. When the connection drops the session is
//! discarded and a new connection is attempted after a fixed delay.

use std::time::Instant as StdInstant;

use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::job::JobStore;
use crate::reporter::{Reporter, WorkerEvent};
use crate::scheduler::Scheduler;
use crate::search::{BATCH_SIZE, search_batch};
use crate::stratum_v1::{
    Action, Connection, ProtocolHandler, ShareTracker, StratumError, SubmitParams, Transport,
};
use crate::tracing::prelude::*;

/// Source of the first nonce of each batch.
pub type NonceSource = fn() -> u32;

/// Why a session ended.
#[derive(Debug)]
pub(crate) enum SessionEnd {
    /// Pool closed the connection
    Closed,

    /// Transport failed
    Failed(StratumError),

    /// Pool sent `client.reconnect`
    Reconnect,

    /// Shutdown requested
    Shutdown,
}

/// Background Stratum v1 mining worker.
pub struct Worker {
    config: WorkerConfig,
    reporter: Reporter,
    shutdown: CancellationToken,
    handler: ProtocolHandler,
    store: JobStore,
    shares: ShareTracker,
    scheduler: Scheduler,
    start_nonce: NonceSource,
}

impl Worker {
    pub fn new(config: WorkerConfig, reporter: Reporter, shutdown: CancellationToken) -> Self {
        let handler = ProtocolHandler::new(config.wallet_address.clone(), config.user_agent.clone());
        let scheduler = Scheduler::new(config.intensity);
        Self {
            config,
            reporter,
            shutdown,
            handler,
            store: JobStore::new(),
            shares: ShareTracker::new(),
            scheduler,
            start_nonce: rand::random::<u32>,
        }
    }

    /// Replace the random batch start nonce.
    pub fn with_nonce_source(mut self, start_nonce: NonceSource) -> Self {
        self.start_nonce = start_nonce;
        self
    }

    /// Connect, mine, and reconnect until shutdown.
    pub async fn run(mut self) {
        info!(
            pool = %self.config.pool,
            wallet = %self.config.wallet_address,
            intensity_ms = self.config.intensity.as_millis() as u64,
            "Worker started"
        );

        while !self.shutdown.is_cancelled() {
            let actions = self.handler.on_connecting();
            self.report_all(actions);

            let connected = tokio::select! {
                result = Connection::connect(&self.config.pool) => result,
                _ = self.shutdown.cancelled() => break,
            };

            let end = match connected {
                Ok(conn) => self.run_session(conn).await,
                Err(e) => SessionEnd::Failed(e),
            };

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Closed => info!(pool = %self.config.pool, "Connection closed by pool"),
                SessionEnd::Reconnect => info!(pool = %self.config.pool, "Reconnecting on pool request"),
                SessionEnd::Failed(e) => {
                    warn!(pool = %self.config.pool, error = %e, "Connection error");
                    self.reporter
                        .report(WorkerEvent::error(format!("Connection error: {}", e)));
                }
            }

            let actions = self
                .handler
                .on_disconnected(&mut self.store, &mut self.shares);
            self.report_all(actions);

            debug!(
                delay_s = self.config.reconnect_delay.as_secs(),
                "Waiting before reconnect"
            );
            tokio::select! {
                _ = sleep(self.config.reconnect_delay) => {}
                _ = self.shutdown.cancelled() => break,
            }
        }

        info!("Worker stopped");
    }

    /// Drive one connected session until it ends.
    pub(crate) async fn run_session<T: Transport>(&mut self, mut transport: T) -> SessionEnd {
        let actions = self.handler.on_connected();
        if let Some(end) = self.apply(&mut transport, actions).await {
            return end;
        }
        self.scheduler.idle(Instant::now());

        loop {
            let deadline = self.scheduler.next_batch_at();

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => return SessionEnd::Shutdown,

                msg = transport.read_message() => match msg {
                    Ok(Some(msg)) => {
                        let actions = self.handler.handle_message(
                            msg,
                            &mut self.store,
                            &mut self.shares,
                            StdInstant::now(),
                        );
                        if let Some(end) = self.apply(&mut transport, actions).await {
                            return end;
                        }
                    }
                    Ok(None) => return SessionEnd::Closed,
                    Err(e) if e.is_recoverable() => {
                        warn!(error = %e, "Received malformed message from pool, ignoring");
                    }
                    Err(e) => return SessionEnd::Failed(e),
                },

                _ = sleep_until(deadline) => {
                    if let Some(end) = self.tick(&mut transport).await {
                        return end;
                    }
                }
            }
        }
    }

    /// Run one search batch if there is authorized work, otherwise idle.
    async fn tick<T: Transport>(&mut self, transport: &mut T) -> Option<SessionEnd> {
        let work = match self.store.work() {
            Some(work) if self.handler.is_authorized() => work,
            _ => {
                self.scheduler.idle(Instant::now());
                return None;
            }
        };

        let mut header = work.header();
        let start_nonce = (self.start_nonce)();
        let started = StdInstant::now();
        let outcome = search_batch(&mut header, work.target, start_nonce, BATCH_SIZE);
        let elapsed = started.elapsed();

        trace!(
            job_id = %work.job.job_id,
            start_nonce = format!("{:#010x}", start_nonce),
            attempts = outcome.attempts,
            elapsed_us = elapsed.as_micros() as u64,
            "Batch finished"
        );

        let submit = outcome.found.map(|found| SubmitParams {
            username: self.config.wallet_address.clone(),
            job_id: work.job.job_id.clone(),
            extranonce2: work.session.extranonce2,
            ntime: work.job.ntime,
            nonce: found.nonce,
        });

        if let Some(found) = outcome.found {
            debug!(hash = %found.hash, nonce = format!("{:#010x}", found.nonce), "Share found");
        }

        let mut end = None;
        if let Some(params) = submit {
            let actions = self
                .handler
                .submit_share(&params, &mut self.shares, StdInstant::now());
            if !self.store.advance_extranonce2() {
                debug!("Extranonce2 wrapped around");
            }
            end = self.apply(transport, actions).await;
        }

        let rate = self
            .scheduler
            .batch_done(outcome.attempts, elapsed, Instant::now());
        self.reporter.report(WorkerEvent::Hashrate(rate));

        end
    }

    /// Carry out handler actions. Returns `Some` if the session must end.
    async fn apply<T: Transport>(
        &mut self,
        transport: &mut T,
        actions: Vec<Action>,
    ) -> Option<SessionEnd> {
        for action in actions {
            match action {
                Action::Send(msg) => {
                    if let Err(e) = transport.write_message(&msg).await {
                        return Some(SessionEnd::Failed(e));
                    }
                }
                Action::Report(event) => self.reporter.report(event),
                Action::Wake => self.scheduler.wake(Instant::now()),
                Action::Reconnect => return Some(SessionEnd::Reconnect),
            }
        }
        None
    }

    fn report_all(&self, actions: Vec<Action>) {
        for action in actions {
            if let Action::Report(event) = action {
                self.reporter.report(event);
            }
        }
    }
}
