//! Hashrate measurement type.

use std::time::Duration;

use serde::Serialize;

/// Hashrate in hashes per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct HashRate(pub u64);

impl HashRate {
    /// Rate achieved by one search batch.
    ///
    /// Computed as `attempts / elapsed_ms * 1000`, floored. Batches that
    /// finish within the clock's resolution report an elapsed time of zero;
    /// that is treated as one millisecond instead of dividing by zero.
    pub fn from_batch(attempts: u64, elapsed: Duration) -> Self {
        let millis = elapsed.as_millis().max(1);
        let rate = attempts as u128 * 1000 / millis;
        Self(u64::try_from(rate).unwrap_or(u64::MAX))
    }

    fn as_kilohashes(&self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    fn as_megahashes(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Format with the largest unit that keeps the value above one.
    pub fn to_human_readable(&self) -> String {
        if self.0 >= 1_000_000 {
            format!("{:.2} MH/s", self.as_megahashes())
        } else if self.0 >= 1_000 {
            format!("{:.2} kH/s", self.as_kilohashes())
        } else {
            format!("{} H/s", self.0)
        }
    }
}

impl std::fmt::Display for HashRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}
