//! Stratum v1 CPU mining worker.
//!
//! A [`worker::Worker`] connects to a pool, follows its jobs, searches nonces
//! in paced batches and submits shares, reporting progress to its host as
//! [`reporter::WorkerEvent`]s. The `moonshotd` binary wraps it in a
//! [`daemon::Daemon`] configured from the environment.

pub mod config;
pub mod daemon;
pub mod job;
pub mod reporter;
pub mod scheduler;
pub mod search;
pub mod stratum_v1;
pub mod tracing;
pub mod types;
pub mod u256;
pub mod worker;

#[cfg(test)]
mod test_blocks;
