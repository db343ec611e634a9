//! Core types for moonshot-miner.
//!
//! Small value types shared by the protocol, job and search code.

mod difficulty;
mod extranonce2;
mod hash_rate;

pub use difficulty::{Difficulty, MAX_TARGET};
pub use extranonce2::{Extranonce2, Extranonce2Error};
pub use hash_rate::HashRate;
