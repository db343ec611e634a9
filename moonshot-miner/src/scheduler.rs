//! Batch pacing.
//!
//! The search runs in bounded batches separated by timed pauses so the
//! worker's event loop keeps servicing the socket. After a batch the next one
//! is due `intensity` later; while there is nothing to work on the scheduler
//! polls every [`IDLE_RETRY`]. New work only cuts the wait short while idle:
//! a running search picks the new job up at its next batch.

use std::time::Duration;

use tokio::time::Instant;

use crate::types::HashRate;

/// Delay before re-checking for work when there is none.
pub const IDLE_RETRY: Duration = Duration::from_millis(100);

/// Decides when the next batch runs.
#[derive(Debug)]
pub struct Scheduler {
    intensity: Duration,
    next_batch: Instant,
    idle: bool,
}

impl Scheduler {
    /// `intensity` is the pause after every batch.
    pub fn new(intensity: Duration) -> Self {
        Self {
            intensity,
            next_batch: Instant::now() + IDLE_RETRY,
            idle: true,
        }
    }

    /// When the next batch (or work check) is due.
    pub fn next_batch_at(&self) -> Instant {
        self.next_batch
    }

    /// New work arrived. If the search is idle, run the next batch now;
    /// otherwise keep the post-batch pause.
    pub fn wake(&mut self, now: Instant) {
        if self.idle {
            self.next_batch = now;
        }
    }

    /// Nothing to do yet; look again shortly.
    pub fn idle(&mut self, now: Instant) {
        self.idle = true;
        self.next_batch = now + IDLE_RETRY;
    }

    /// A batch finished: schedule the next one and return its rate.
    pub fn batch_done(&mut self, attempts: u64, elapsed: Duration, now: Instant) -> HashRate {
        self.idle = false;
        self.next_batch = now + self.intensity;
        HashRate::from_batch(attempts, elapsed)
    }
}
