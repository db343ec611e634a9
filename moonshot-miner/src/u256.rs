//! 256-bit unsigned integer for share target arithmetic.
//!
//! Provides just enough to turn a pool difficulty into a target: byte
//! conversions and division by a 64-bit difficulty. Comparisons against
//! header hashes happen on [`bitcoin::Target`].

use std::cmp::Ordering;
use std::ops::Div;

use bitcoin::Target;

/// A 256-bit unsigned integer stored as two 128-bit limbs.
///
/// Ordering compares `high` first, which matches numeric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct U256 {
    /// Low 128 bits
    pub low: u128,
    /// High 128 bits
    pub high: u128,
}

impl U256 {
    /// Convert to little-endian bytes.
    pub fn to_le_bytes(self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[0..16].copy_from_slice(&self.low.to_le_bytes());
        bytes[16..32].copy_from_slice(&self.high.to_le_bytes());
        bytes
    }

    /// Divide by a u64 value.
    ///
    /// Long division over four 64-bit limbs, most significant first. The
    /// result is floored.
    ///
    /// # Panics
    ///
    /// Panics if `divisor` is zero.
    pub fn div_u64(self, divisor: u64) -> Self {
        assert!(divisor != 0, "U256 division by zero");

        if divisor == 1 {
            return self;
        }

        if self.high == 0 {
            return Self {
                low: self.low / divisor as u128,
                high: 0,
            };
        }

        let divisor = divisor as u128;
        let limbs = [
            (self.high >> 64) as u64,
            self.high as u64,
            (self.low >> 64) as u64,
            self.low as u64,
        ];

        let mut remainder: u128 = 0;
        let mut quotient = [0u64; 4];
        for (i, &limb) in limbs.iter().enumerate() {
            remainder = (remainder << 64) | limb as u128;
            quotient[i] = (remainder / divisor) as u64;
            remainder %= divisor;
        }

        Self {
            low: ((quotient[2] as u128) << 64) | quotient[3] as u128,
            high: ((quotient[0] as u128) << 64) | quotient[1] as u128,
        }
    }
}

impl Div<u64> for U256 {
    type Output = Self;

    fn div(self, rhs: u64) -> Self::Output {
        self.div_u64(rhs)
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.high
            .cmp(&other.high)
            .then_with(|| self.low.cmp(&other.low))
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<U256> for Target {
    fn from(value: U256) -> Self {
        Target::from_le_bytes(value.to_le_bytes())
    }
}
