//! Current job and session state.
//!
//! There is exactly one job at a time: every `mining.notify` replaces it
//! wholesale and nothing is queued. The [`JobStore`] pairs it with the
//! per-connection session values (extranonce1, the extranonce2 counter,
//! difficulty and target) the header builder needs.

pub mod header;
pub mod merkle;

use bitcoin::Target;
use tracing::debug;

use crate::stratum_v1::JobNotification;
use crate::types::{Difficulty, Extranonce2, Extranonce2Error};

pub use header::{Header, build_header, set_nonce};

/// Values the pool assigns at subscription time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Pool-assigned extranonce1
    pub extranonce1: Vec<u8>,

    /// Miner-controlled counter, sized by the pool
    pub extranonce2: Extranonce2,
}

/// Everything needed to build a header for the current job.
#[derive(Debug, Clone, Copy)]
pub struct Work<'a> {
    pub job: &'a JobNotification,
    pub session: &'a Session,
    pub target: Target,
}

impl Work<'_> {
    /// Header for this work with the nonce field zeroed.
    pub fn header(&self) -> Header {
        build_header(
            self.job,
            &self.session.extranonce1,
            &self.session.extranonce2,
        )
    }
}

/// Single active job plus session parameters.
#[derive(Debug)]
pub struct JobStore {
    job: Option<JobNotification>,
    session: Option<Session>,
    difficulty: Difficulty,
    target: Target,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            job: None,
            session: None,
            difficulty: Difficulty::ONE,
            target: Difficulty::ONE.to_target(),
        }
    }

    /// Install the subscription values; the extranonce2 counter starts at 0.
    pub fn set_session(
        &mut self,
        extranonce1: Vec<u8>,
        extranonce2_size: usize,
    ) -> Result<(), Extranonce2Error> {
        let extranonce2 = Extranonce2::new(extranonce2_size)?;
        self.session = Some(Session {
            extranonce1,
            extranonce2,
        });
        Ok(())
    }

    /// Update difficulty and recompute the target. Returns the new target.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Target {
        self.difficulty = difficulty;
        self.target = difficulty.to_target();
        self.target
    }

    /// Replace the current job. With `clean_jobs` the extranonce2 counter
    /// goes back to zero.
    pub fn replace_job(&mut self, job: JobNotification) {
        if job.clean_jobs {
            if let Some(session) = self.session.as_mut() {
                session.extranonce2.reset();
            }
        }
        debug!(
            job_id = %job.job_id,
            clean = job.clean_jobs,
            difficulty = %self.difficulty,
            "Job replaced"
        );
        self.job = Some(job);
    }

    /// Advance extranonce2 after a submission. Returns `false` on wraparound
    /// or when there is no session.
    pub fn advance_extranonce2(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) => session.extranonce2.increment(),
            None => false,
        }
    }

    /// Current work, if both a job and a session are present.
    pub fn work(&self) -> Option<Work<'_>> {
        Some(Work {
            job: self.job.as_ref()?,
            session: self.session.as_ref()?,
            target: self.target,
        })
    }

    /// Forget everything tied to the connection.
    pub fn clear(&mut self) {
        self.job = None;
        self.session = None;
        self.set_difficulty(Difficulty::ONE);
    }
}

#[cfg(test)]
impl JobStore {
    pub fn job(&self) -> Option<&JobNotification> {
        self.job.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn target(&self) -> Target {
        self.target
    }
}
