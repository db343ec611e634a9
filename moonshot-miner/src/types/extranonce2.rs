//! Extranonce2 counter.
//!
//! The pool tells us at subscription time how many bytes of the coinbase
//! belong to the miner (`extranonce2_size`). We fill them with a counter that
//! advances once per submitted share and resets whenever the pool sends a job
//! with `clean_jobs` set, so no two submissions against the same job share a
//! coinbase (and therefore a merkle root).
//!
//! On the wire and inside the coinbase the counter is a fixed-width,
//! big-endian, zero-padded byte string.

use std::fmt;

use thiserror::Error;

/// Errors that can occur when creating an [`Extranonce2`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Extranonce2Error {
    #[error("Invalid extranonce2 size: {0} (must be 1-8 bytes)")]
    InvalidSize(usize),
}

/// Miner-controlled extranonce value with a pool-assigned width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extranonce2 {
    value: u64,
    size: u8,
}

impl Extranonce2 {
    /// Create a counter of `size` bytes, starting at zero.
    pub fn new(size: usize) -> Result<Self, Extranonce2Error> {
        Self::with_value(0, size)
    }

    /// Create a counter of `size` bytes holding `value` (reduced modulo the
    /// counter's range).
    pub fn with_value(value: u64, size: usize) -> Result<Self, Extranonce2Error> {
        if size == 0 || size > 8 {
            return Err(Extranonce2Error::InvalidSize(size));
        }
        let mut en2 = Self {
            value: 0,
            size: size as u8,
        };
        en2.value = value & en2.max_value();
        Ok(en2)
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Width in bytes.
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Largest value representable in `size` bytes.
    pub fn max_value(&self) -> u64 {
        if self.size >= 8 {
            u64::MAX
        } else {
            (1u64 << (self.size * 8)) - 1
        }
    }

    /// Advance by one, wrapping modulo `2^(8 * size)`.
    ///
    /// Returns `false` if the counter wrapped back to zero.
    pub fn increment(&mut self) -> bool {
        if self.value < self.max_value() {
            self.value += 1;
            true
        } else {
            self.value = 0;
            false
        }
    }

    /// Reset to zero, keeping the width.
    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Append the big-endian, zero-padded bytes of this counter.
    pub fn extend_vec(&self, vec: &mut Vec<u8>) {
        let bytes = self.value.to_be_bytes();
        vec.extend_from_slice(&bytes[8 - self.size as usize..]);
    }
}

impl From<Extranonce2> for Vec<u8> {
    fn from(en2: Extranonce2) -> Vec<u8> {
        let mut vec = Vec::with_capacity(en2.size as usize);
        en2.extend_vec(&mut vec);
        vec
    }
}

/// Lowercase hex, two digits per byte, as sent in `mining.submit`.
impl fmt::Display for Extranonce2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$x}", self.value, width = self.size as usize * 2)
    }
}
